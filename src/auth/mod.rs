//! Auth Module
//!
//! JWT access/refresh token lifecycle on the server: signing, rotation with
//! single-use refresh tokens, revocation and bearer verification.

mod claims;
mod issuer;
pub mod middleware;
mod service;
mod store;

pub use claims::{
    AccessClaims, Identity, IssuedTokens, RefreshClaims, Role, TokenPair, ACCESS_TOKEN_TYPE,
    REFRESH_TOKEN_TYPE,
};
pub use issuer::{decode_unverified, TokenError, TokenIssuer};
pub use middleware::{bearer_token, require_admin, require_auth};
pub use service::AuthService;
pub use store::{
    ConsumeOutcome, InMemoryRefreshTokenStore, RefreshRecord, RefreshTokenStore, StoreError,
    StoreResult,
};
