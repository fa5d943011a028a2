//! API Handlers
//!
//! HTTP request handlers for the auth and cache administration endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Extension, Json,
};
use serde_json::Value;
use tracing::info;

use crate::auth::{AccessClaims, AuthService, InMemoryRefreshTokenStore, TokenIssuer, TokenPair};
use crate::cache::{keys, CacheService, CacheStats};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    HealthResponse, InvalidationResponse, LogoutRequest, LogoutResponse, MeResponse,
    RefreshRequest, SuspendResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared response/query cache
    pub cache: CacheService<Value>,
    pub auth: Arc<AuthService>,
    /// TTL of cached GET responses; `None` uses the cache default
    pub response_ttl: Option<Duration>,
}

impl AppState {
    pub fn new(cache: CacheService<Value>, auth: AuthService) -> Self {
        Self {
            cache,
            auth: Arc::new(auth),
            response_ttl: None,
        }
    }

    /// Creates a new AppState from configuration, with in-memory refresh token storage.
    pub fn from_config(config: &Config) -> Self {
        let auth = AuthService::new(
            TokenIssuer::from_config(config),
            Arc::new(InMemoryRefreshTokenStore::new()),
        );
        Self::new(CacheService::from_config(config), auth)
            .with_response_ttl(config.response_cache_ttl())
    }

    pub fn with_response_ttl(mut self, ttl: Duration) -> Self {
        self.response_ttl = Some(ttl);
        self
    }
}

/// Drops everything cached on behalf of `subject`.
async fn invalidate_subject(cache: &CacheService<Value>, subject: &str) -> usize {
    let mut removed = cache
        .delete_by_prefix(&keys::responses_for_subject_prefix(subject))
        .await;
    removed += cache
        .delete_by_prefix(&keys::projects_for_user_prefix(subject))
        .await;
    if cache.delete(&keys::user(subject)).await {
        removed += 1;
    }
    removed
}

// == Auth Handlers ==

/// Handler for POST /refresh
///
/// Exchanges a refresh token for a new pair. The presented token is consumed.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let pair = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(pair))
}

/// Handler for POST /logout
///
/// Revokes the presented refresh token's family (or every session of the
/// caller) and drops the caller's cached responses.
///
/// Only an empty body means "every session". A body that is present but
/// does not parse is rejected rather than widened to a global logout.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    body: Bytes,
) -> Result<Json<LogoutResponse>> {
    let req = parse_logout_body(&body)?;

    let revoked_tokens = state
        .auth
        .logout(&claims.sub, req.refresh_token.as_deref())
        .await?;
    let invalidated_entries = invalidate_subject(&state.cache, &claims.sub).await;

    Ok(Json(LogoutResponse {
        revoked_tokens,
        invalidated_entries,
    }))
}

fn parse_logout_body(body: &[u8]) -> Result<LogoutRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LogoutRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidRequest(format!("malformed logout body: {e}")))
}

/// Handler for GET /me
pub async fn me_handler(Extension(claims): Extension<AccessClaims>) -> Json<MeResponse> {
    Json(MeResponse::from(&claims))
}

// == Cache Administration Handlers ==

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// Handler for DELETE /cache/key/:key
pub async fn delete_key_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<InvalidationResponse> {
    let removed = usize::from(state.cache.delete(&key).await);
    Json(InvalidationResponse::new(key, removed))
}

/// Handler for DELETE /cache/prefix/:prefix
pub async fn delete_prefix_handler(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<Json<InvalidationResponse>> {
    // An empty prefix would wipe the whole cache
    if prefix.is_empty() {
        return Err(ApiError::InvalidRequest("Prefix cannot be empty".to_string()));
    }

    let removed = state.cache.delete_by_prefix(&prefix).await;
    info!(prefix = %prefix, removed, "cache prefix invalidated");
    Ok(Json(InvalidationResponse::new(prefix, removed)))
}

/// Handler for DELETE /cache/tag/:tag
pub async fn delete_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<InvalidationResponse> {
    let removed = state.cache.delete_by_tag(&tag).await;
    info!(tag = %tag, removed, "cache tag invalidated");
    Json(InvalidationResponse::new(tag, removed))
}

/// Handler for POST /cache/cleanup
///
/// Runs a sweep immediately instead of waiting for the background task.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<InvalidationResponse> {
    let removed = state.cache.cleanup().await;
    Json(InvalidationResponse::new("expired", removed))
}

/// Handler for POST /admin/users/:id/suspend
pub async fn suspend_handler(
    State(state): State<AppState>,
    Extension(admin): Extension<AccessClaims>,
    Path(subject): Path<String>,
) -> Result<Json<SuspendResponse>> {
    let revoked_tokens = state.auth.suspend(&subject).await?;
    let invalidated_entries = invalidate_subject(&state.cache, &subject).await;
    info!(admin = %admin.sub, subject = %subject, "user suspended by admin");

    Ok(Json(SuspendResponse {
        subject,
        revoked_tokens,
        invalidated_entries,
    }))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Identity, Role};

    fn test_state() -> AppState {
        let issuer = TokenIssuer::new(
            b"test-secret",
            chrono::Duration::minutes(15),
            chrono::Duration::days(7),
        );
        let auth = AuthService::new(issuer, Arc::new(InMemoryRefreshTokenStore::new()));
        AppState::new(CacheService::new(100, Duration::from_secs(300)), auth)
    }

    fn alice() -> Identity {
        Identity::new("user-1", "alice@example.com", Role::Client)
    }

    #[tokio::test]
    async fn test_refresh_handler_rotates() {
        let state = test_state();
        let pair = state.auth.start_session(&alice()).await.unwrap();

        let req = RefreshRequest {
            refresh_token: pair.refresh_token.clone(),
        };
        let result = refresh_handler(State(state.clone()), Json(req.clone())).await;
        assert!(result.is_ok());

        let replay = refresh_handler(State(state), Json(req)).await;
        assert!(matches!(replay, Err(ApiError::RefreshExhausted(_))));
    }

    #[tokio::test]
    async fn test_refresh_handler_rejects_empty_token() {
        let req = RefreshRequest {
            refresh_token: String::new(),
        };
        let result = refresh_handler(State(test_state()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_logout_invalidates_cached_responses() {
        let state = test_state();
        let pair = state.auth.start_session(&alice()).await.unwrap();
        let claims = state.auth.authenticate(&pair.access_token).unwrap();

        let mine = keys::response("user-1", "GET", "/me");
        let theirs = keys::response("user-2", "GET", "/me");
        state.cache.set(mine.clone(), Value::Null, None).await;
        state.cache.set(theirs.clone(), Value::Null, None).await;

        let response = logout_handler(State(state.clone()), Extension(claims), Bytes::new())
            .await
            .unwrap();
        assert_eq!(response.revoked_tokens, 1);
        assert_eq!(response.invalidated_entries, 1);

        assert!(!state.cache.has(&mine).await);
        assert!(state.cache.has(&theirs).await);
    }

    #[tokio::test]
    async fn test_logout_rejects_malformed_body() {
        let state = test_state();
        let laptop = state.auth.start_session(&alice()).await.unwrap();
        let phone = state.auth.start_session(&alice()).await.unwrap();
        let claims = state.auth.authenticate(&laptop.access_token).unwrap();

        let result = logout_handler(
            State(state.clone()),
            Extension(claims),
            Bytes::from_static(b"{\"refreshToken\": "),
        )
        .await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));

        // Neither session was revoked
        assert!(state.auth.refresh(&laptop.refresh_token).await.is_ok());
        assert!(state.auth.refresh(&phone.refresh_token).await.is_ok());
    }

    #[test]
    fn test_parse_logout_body() {
        assert_eq!(parse_logout_body(b"").unwrap().refresh_token, None);
        assert_eq!(parse_logout_body(b" \n").unwrap().refresh_token, None);
        assert_eq!(
            parse_logout_body(br#"{"refreshToken":"abc"}"#)
                .unwrap()
                .refresh_token
                .as_deref(),
            Some("abc")
        );
        assert!(parse_logout_body(b"refreshToken=abc").is_err());
    }

    #[tokio::test]
    async fn test_delete_prefix_rejects_empty() {
        let result = delete_prefix_handler(State(test_state()), Path(String::new())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete_tag_handler() {
        let state = test_state();
        state
            .cache
            .set(keys::tagged("pricing", "quote:1"), Value::Null, None)
            .await;
        state.cache.set(keys::quote(1), Value::Null, None).await;

        let response = delete_tag_handler(State(state.clone()), Path("pricing".into())).await;
        assert_eq!(response.removed, 1);
        assert_eq!(state.cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
