//! Request DTOs for the auth API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for `POST /refresh`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// The refresh token to exchange
    pub refresh_token: String,
}

impl RefreshRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.refresh_token.trim().is_empty() {
            return Some("Refresh token cannot be empty".to_string());
        }
        None
    }
}

/// Request body for `POST /logout`
///
/// Without a refresh token every session of the caller is ended.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}
