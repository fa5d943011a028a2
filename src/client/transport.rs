//! Refresh transport.
//!
//! How the coordinator reaches `POST /refresh`. The HTTP implementation
//! carries the request timeout; the coordinator itself never times out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::TokenPair;
use crate::client::ClientError;

/// Timeout applied by [`HttpRefreshTransport::new`].
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

// == Transport Trait ==
/// Exchanges a refresh token for a new pair.
///
/// Implementations return [`ClientError::RefreshExhausted`] when the server
/// rejected the token and [`ClientError::Transport`] for anything retryable.
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError>;
}

// == HTTP Transport ==
pub struct HttpRefreshTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRefreshTransport {
    /// Targets `{base_url}/refresh` with [`DEFAULT_REFRESH_TIMEOUT`].
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REFRESH_TIMEOUT)
    }

    /// Targets `{base_url}/refresh` with a custom timeout.
    ///
    /// # Arguments
    /// * `base_url` - Server root, with or without a trailing slash
    /// * `timeout` - Whole-request timeout for each refresh call
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/refresh", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(%status, "refresh response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            let body: Value = response.json().await.unwrap_or_default();
            let reason = body["error"]
                .as_str()
                .unwrap_or("refresh rejected")
                .to_string();
            return Err(ClientError::RefreshExhausted(reason));
        }

        if !status.is_success() {
            return Err(ClientError::Transport(format!(
                "unexpected status {status}"
            )));
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}
