//! Error types for the HTTP surface
//!
//! Provides unified error handling using thiserror. Cache lookups never fail;
//! only the auth and request layers produce errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::{StoreError, TokenError};

// == API Error Enum ==
/// Unified error type for request handlers and middleware.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Access token signature was valid but its expiry has passed; refreshable
    #[error("Access token expired")]
    TokenExpired,

    /// Token is missing, malformed or badly signed; not refreshable
    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    /// Refresh token expired, revoked or already consumed; re-authentication required
    #[error("Refresh token rejected: {0}")]
    RefreshExhausted(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::TokenExpired => "token_expired",
            ApiError::TokenInvalid(_) => "token_invalid",
            ApiError::RefreshExhausted(_) => "refresh_exhausted",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::TokenExpired | ApiError::TokenInvalid(_) | ApiError::RefreshExhausted(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::TokenExpired,
            TokenError::Invalid(reason) => ApiError::TokenInvalid(reason),
            TokenError::Signing(reason) => ApiError::Internal(reason),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for request handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
