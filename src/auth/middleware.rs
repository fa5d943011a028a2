//! Bearer Auth Middleware
//!
//! Verifies the `Authorization: Bearer` header and hands the verified claims
//! to downstream handlers through request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::{AccessClaims, AuthService};
use crate::error::{ApiError, Result};

// == Bearer Extraction ==
/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// == Middleware ==
/// Rejects the request unless it carries a valid access token.
///
/// An expired token yields `token_expired` so the client knows a refresh can
/// help; anything else yields `token_invalid`.
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::TokenInvalid("missing bearer token".to_string()))?;

    let claims = auth.authenticate(token).inspect_err(|e| {
        debug!(code = e.code(), "bearer token rejected");
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Admin gate. Must run inside [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response> {
    match req.extensions().get::<AccessClaims>() {
        Some(claims) if claims.is_admin() => Ok(next.run(req).await),
        Some(claims) => Err(ApiError::Forbidden(format!(
            "role '{}' may not access this resource",
            claims.role
        ))),
        None => Err(ApiError::TokenInvalid("missing bearer token".to_string())),
    }
}
