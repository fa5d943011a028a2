//! Client Module
//!
//! Client-side session handling: holds the token pair, collapses concurrent
//! refreshes into one network call and notifies listeners of transitions.

mod coordinator;
mod listeners;
mod transport;

use thiserror::Error;

pub use coordinator::RefreshCoordinator;
pub use listeners::{AuthEvent, Listeners, Subscription};
pub use transport::{HttpRefreshTransport, RefreshTransport, DEFAULT_REFRESH_TIMEOUT};

// == Client Error ==
/// Failure seen by callers of the coordinator.
///
/// Clonable: every waiter of a collapsed refresh receives the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Refresh token expired, revoked or already used
    #[error("refresh token rejected: {0}")]
    RefreshExhausted(String),

    /// Access token rejected as malformed or forged
    #[error("access token invalid: {0}")]
    TokenInvalid(String),

    /// The session was logged out while the call was pending
    #[error("session terminated")]
    SessionTerminated,

    /// No tokens to authenticate with
    #[error("not authenticated")]
    Unauthenticated,

    /// Network or server failure; the session is left as it was
    #[error("transport error: {0}")]
    Transport(String),

    /// The request itself failed for a reason unrelated to auth
    #[error("request failed: {0}")]
    Request(String),
}

impl ClientError {
    /// Whether this error ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClientError::RefreshExhausted(_)
                | ClientError::TokenInvalid(_)
                | ClientError::Unauthenticated
        )
    }
}

// == Request Error ==
/// Outcome of an authenticated request, as classified by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// 401 with an expired access token; recoverable through a refresh
    Unauthorized,
    /// 401 with a malformed or forged access token
    TokenInvalid(String),
    Failed(String),
}

impl RequestError {
    /// Classifies a 401 by the server's error `code`.
    ///
    /// # Arguments
    /// * `code` - The `code` field of the error body, if it had one
    pub fn from_unauthorized_code(code: Option<&str>) -> Self {
        match code {
            Some("token_invalid") => RequestError::TokenInvalid("rejected by server".to_string()),
            _ => RequestError::Unauthorized,
        }
    }
}

impl From<RequestError> for ClientError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Unauthorized => {
                ClientError::Request("unauthorized after refresh".to_string())
            }
            RequestError::TokenInvalid(reason) => ClientError::TokenInvalid(reason),
            RequestError::Failed(reason) => ClientError::Request(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_errors() {
        assert!(ClientError::RefreshExhausted("used".into()).is_terminal());
        assert!(ClientError::TokenInvalid("sig".into()).is_terminal());
        assert!(!ClientError::Transport("timeout".into()).is_terminal());
        assert!(!ClientError::SessionTerminated.is_terminal());
    }

    #[test]
    fn test_unauthorized_classification() {
        assert_eq!(
            RequestError::from_unauthorized_code(Some("token_expired")),
            RequestError::Unauthorized
        );
        assert_eq!(RequestError::from_unauthorized_code(None), RequestError::Unauthorized);
        assert!(matches!(
            RequestError::from_unauthorized_code(Some("token_invalid")),
            RequestError::TokenInvalid(_)
        ));
    }
}
