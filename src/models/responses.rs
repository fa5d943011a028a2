//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::auth::{AccessClaims, Role};

/// Response body for `GET /me`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub subject: String,
    pub email: String,
    pub role: Role,
    /// Access token expiry, unix seconds
    pub expires_at: i64,
}

impl From<&AccessClaims> for MeResponse {
    fn from(claims: &AccessClaims) -> Self {
        Self {
            subject: claims.sub.clone(),
            email: claims.email.clone(),
            role: claims.role,
            expires_at: claims.exp,
        }
    }
}

/// Response body for `POST /logout`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    /// Refresh tokens revoked
    pub revoked_tokens: usize,
    /// Cached responses dropped for the caller
    pub invalidated_entries: usize,
}

/// Response body for the cache invalidation endpoints
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationResponse {
    /// The key, prefix or tag that was invalidated
    pub target: String,
    /// Number of entries removed
    pub removed: usize,
}

impl InvalidationResponse {
    pub fn new(target: impl Into<String>, removed: usize) -> Self {
        Self {
            target: target.into(),
            removed,
        }
    }
}

/// Response body for `POST /admin/users/{id}/suspend`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendResponse {
    pub subject: String,
    pub revoked_tokens: usize,
    pub invalidated_entries: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
