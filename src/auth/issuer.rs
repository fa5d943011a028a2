//! Token Issuer
//!
//! Signs and verifies HS256 access/refresh tokens with a server-held secret.
//! Expired tokens are reported separately from malformed or forged ones:
//! only the former can be recovered through a refresh.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::claims::{
    AccessClaims, Identity, IssuedTokens, RefreshClaims, TokenPair, ACCESS_TOKEN_TYPE,
    REFRESH_TOKEN_TYPE,
};
use crate::config::Config;

/// Verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Signature checks out but `exp` has passed
    #[error("token expired")]
    Expired,

    /// Malformed, badly signed, or the wrong kind of token
    #[error("invalid token: {0}")]
    Invalid(String),

    /// Signing failed on our side
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(err.to_string()),
        }
    }
}

/// Longest lifetime a token can be issued with (100 years).
const MAX_TOKEN_LIFETIME_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Caps a configured lifetime so `iat + lifetime` stays a representable timestamp.
fn clamp_lifetime(ttl: Duration) -> Duration {
    ttl.min(Duration::seconds(MAX_TOKEN_LIFETIME_SECS))
}

/// Converts a lifetime in seconds from configuration, saturating at the cap.
fn lifetime_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .map(clamp_lifetime)
        .unwrap_or_else(|| Duration::seconds(MAX_TOKEN_LIFETIME_SECS))
}

// == Token Issuer ==
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Creates an issuer signing with `secret`.
    ///
    /// # Arguments
    /// * `secret` - HMAC key shared by signing and verification
    /// * `access_ttl` - Lifetime of access tokens, capped at 100 years
    /// * `refresh_ttl` - Lifetime of refresh tokens, capped at 100 years
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // An access token is dead the second its exp passes
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl: clamp_lifetime(access_ttl),
            refresh_ttl: clamp_lifetime(refresh_ttl),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            lifetime_from_secs(config.access_token_ttl),
            lifetime_from_secs(config.refresh_token_ttl),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    // == Issue ==
    /// Mints a pair starting a new refresh family.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedTokens, TokenError> {
        self.issue_in_family(identity, &Uuid::new_v4().to_string())
    }

    /// Mints a pair continuing an existing refresh family (rotation).
    pub fn issue_in_family(
        &self,
        identity: &Identity,
        family: &str,
    ) -> Result<IssuedTokens, TokenError> {
        self.issue_at(identity, family, Utc::now().timestamp())
    }

    /// Mints a pair as of `now` (unix seconds).
    ///
    /// # Arguments
    /// * `identity` - Account the pair is issued for
    /// * `family` - Rotation family of the refresh token
    /// * `now` - Issue time, unix seconds
    pub fn issue_at(
        &self,
        identity: &Identity,
        family: &str,
        now: i64,
    ) -> Result<IssuedTokens, TokenError> {
        let access = AccessClaims {
            sub: identity.subject.clone(),
            email: identity.email.clone(),
            role: identity.role,
            iat: now,
            exp: now.saturating_add(self.access_ttl.num_seconds()),
            jti: Uuid::new_v4().to_string(),
            typ: ACCESS_TOKEN_TYPE.to_string(),
        };
        let refresh = RefreshClaims {
            sub: identity.subject.clone(),
            family: family.to_string(),
            iat: now,
            exp: now.saturating_add(self.refresh_ttl.num_seconds()),
            jti: Uuid::new_v4().to_string(),
            typ: REFRESH_TOKEN_TYPE.to_string(),
        };

        let pair = TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            access_expires_at: access.exp,
            refresh_expires_at: refresh.exp,
        };

        Ok(IssuedTokens {
            pair,
            access,
            refresh,
        })
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    // == Verify ==
    /// Checks signature, expiry and token type of an access token.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.verify(token)?;
        if claims.typ != ACCESS_TOKEN_TYPE {
            return Err(TokenError::Invalid("not an access token".to_string()));
        }
        Ok(claims)
    }

    /// Checks signature, expiry and token type of a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.verify(token)?;
        if claims.typ != REFRESH_TOKEN_TYPE {
            return Err(TokenError::Invalid("not a refresh token".to_string()));
        }
        Ok(claims)
    }

    fn verify<T: DeserializeOwned + Clone>(&self, token: &str) -> Result<T, TokenError> {
        let data = decode::<T>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

// == Decode ==
/// Reads a token's payload without checking anything.
///
/// For logging and inspection only; never base an authorization decision on it.
pub fn decode_unverified(token: &str) -> Result<serde_json::Value, TokenError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| TokenError::Invalid("token has no payload segment".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Invalid(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenError::Invalid(e.to_string()))
}
