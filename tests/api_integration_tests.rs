//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle through the router, middleware included.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use reno_core::{
    api::{create_router, X_CACHE},
    auth::{AuthService, Identity, InMemoryRefreshTokenStore, Role, TokenIssuer, TokenPair},
    cache::{keys, CacheService},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

const SECRET: &[u8] = b"integration-secret";

fn issuer() -> TokenIssuer {
    TokenIssuer::new(SECRET, chrono::Duration::minutes(15), chrono::Duration::days(7))
}

fn create_state() -> AppState {
    let auth = AuthService::new(issuer(), Arc::new(InMemoryRefreshTokenStore::new()));
    AppState::new(CacheService::new(100, Duration::from_secs(300)), auth)
}

fn alice() -> Identity {
    Identity::new("user-1", "alice@example.com", Role::Client)
}

fn admin() -> Identity {
    Identity::new("admin-1", "ops@example.com", Role::Admin)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn refresh_request(refresh_token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/refresh")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "refreshToken": refresh_token }).to_string()))
        .unwrap()
}

// == Refresh Endpoint Tests ==

#[tokio::test]
async fn test_refresh_rotates_and_rejects_reuse() {
    let state = create_state();
    let pair = state.auth.start_session(&alice()).await.unwrap();
    let app = create_router(state);

    let response = send(&app, refresh_request(&pair.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let rotated: TokenPair = serde_json::from_value(json).unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    // The consumed token is dead
    let response = send(&app, refresh_request(&pair.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "refresh_exhausted");

    // Replaying it revoked the family, including the rotated token
    let response = send(&app, refresh_request(&rotated.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_invalid_json_request() {
    let app = create_router(create_state());

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/refresh")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"invalid json"#))
            .unwrap(),
    )
    .await;

    // Axum returns 400/422 for JSON parsing errors
    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

// == Bearer Auth Tests ==

#[tokio::test]
async fn test_expired_and_invalid_tokens_are_distinguished() {
    let state = create_state();
    let app = create_router(state);

    let stale = chrono::Utc::now().timestamp() - 3600;
    let expired = issuer().issue_at(&alice(), "fam", stale).unwrap();
    let response = send(&app, get("/me", &expired.pair.access_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "token_expired");

    let forged = TokenIssuer::new(
        b"someone-else",
        chrono::Duration::minutes(15),
        chrono::Duration::days(7),
    )
    .issue(&alice())
    .unwrap();
    let response = send(&app, get("/me", &forged.pair.access_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "token_invalid");
}

#[tokio::test]
async fn test_refresh_token_is_not_a_bearer() {
    let state = create_state();
    let pair = state.auth.start_session(&alice()).await.unwrap();
    let app = create_router(state);

    let response = send(&app, get("/me", &pair.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "token_invalid");
}

// == Response Cache Tests ==

#[tokio::test]
async fn test_me_is_cached_per_subject() {
    let state = create_state();
    let cache = state.cache.clone();
    let pair = state.auth.start_session(&alice()).await.unwrap();
    let app = create_router(state);

    let first = send(&app, get("/me", &pair.access_token)).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[X_CACHE], "MISS");
    let json = body_to_json(first.into_body()).await;
    assert_eq!(json["subject"], "user-1");

    let second = send(&app, get("/me", &pair.access_token)).await;
    assert_eq!(second.headers()[X_CACHE], "HIT");
    let json = body_to_json(second.into_body()).await;
    assert_eq!(json["email"], "alice@example.com");

    assert!(cache.has(&keys::response("user-1", "GET", "/me")).await);
    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_logout_revokes_and_drops_cached_responses() {
    let state = create_state();
    let cache = state.cache.clone();
    let pair = state.auth.start_session(&alice()).await.unwrap();
    let app = create_router(state);

    send(&app, get("/me", &pair.access_token)).await;
    assert_eq!(cache.len().await, 1);

    let response = send(
        &app,
        authed(
            "POST",
            "/logout",
            &pair.access_token,
            json!({ "refreshToken": pair.refresh_token }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["revokedTokens"], 1);
    assert_eq!(json["invalidatedEntries"], 1);
    assert!(cache.is_empty().await);

    let response = send(&app, refresh_request(&pair.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

fn raw_logout(token: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/logout")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_logout_without_content_type_revokes_only_that_session() {
    let state = create_state();
    let laptop = state.auth.start_session(&alice()).await.unwrap();
    let phone = state.auth.start_session(&alice()).await.unwrap();
    let app = create_router(state);

    let body = json!({ "refreshToken": laptop.refresh_token }).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/logout")
        .header("authorization", format!("Bearer {}", laptop.access_token))
        .body(Body::from(body))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["revokedTokens"], 1);

    let response = send(&app, refresh_request(&laptop.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = send(&app, refresh_request(&phone.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_with_malformed_body_is_rejected() {
    let state = create_state();
    let laptop = state.auth.start_session(&alice()).await.unwrap();
    let phone = state.auth.start_session(&alice()).await.unwrap();
    let app = create_router(state);

    let response = send(&app, raw_logout(&laptop.access_token, "{\"refreshToken\":")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "invalid_request");

    let response = send(&app, refresh_request(&phone.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_with_empty_body_revokes_every_session() {
    let state = create_state();
    let laptop = state.auth.start_session(&alice()).await.unwrap();
    let phone = state.auth.start_session(&alice()).await.unwrap();
    let app = create_router(state);

    let response = send(&app, raw_logout(&laptop.access_token, "")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["revokedTokens"], 2);

    let response = send(&app, refresh_request(&phone.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// == Admin Endpoint Tests ==

#[tokio::test]
async fn test_admin_endpoints_reject_non_admins() {
    let state = create_state();
    let pair = state.auth.start_session(&alice()).await.unwrap();
    let app = create_router(state);

    let response = send(&app, get("/cache/stats", &pair.access_token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "forbidden");
}

#[tokio::test]
async fn test_admin_cache_invalidation() {
    let state = create_state();
    let cache = state.cache.clone();
    let pair = state.auth.start_session(&admin()).await.unwrap();
    let app = create_router(state);

    cache.set(keys::project(1), json!({ "name": "Kitchen" }), None).await;
    cache
        .set(keys::projects_for_user(7, &json!({ "page": 1 })), json!([]), None)
        .await;
    cache
        .set(keys::projects_for_user(7, &json!({ "page": 2 })), json!([]), None)
        .await;
    cache
        .set(keys::tagged("pricing", "quote:9"), json!(120), None)
        .await;

    let response = send(
        &app,
        authed("DELETE", "/cache/prefix/projects:user:7:", &pair.access_token, json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await["removed"], 2);

    let response = send(
        &app,
        authed("DELETE", "/cache/tag/pricing", &pair.access_token, json!({})),
    )
    .await;
    assert_eq!(body_to_json(response.into_body()).await["removed"], 1);

    let response = send(
        &app,
        authed("DELETE", "/cache/key/project:1", &pair.access_token, json!({})),
    )
    .await;
    assert_eq!(body_to_json(response.into_body()).await["removed"], 1);

    let response = send(&app, get("/cache/stats", &pair.access_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total_entries"], 0);
    assert_eq!(json["deletes"], 4);
    assert_eq!(json["capacity"], 100);
}

#[tokio::test]
async fn test_cleanup_endpoint_sweeps_expired() {
    let state = create_state();
    let cache = state.cache.clone();
    let pair = state.auth.start_session(&admin()).await.unwrap();
    let app = create_router(state);

    cache
        .set("short", json!(1), Some(Duration::from_millis(10)))
        .await;
    cache.set("long", json!(2), None).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let response = send(
        &app,
        authed("POST", "/cache/cleanup", &pair.access_token, json!({})),
    )
    .await;
    assert_eq!(body_to_json(response.into_body()).await["removed"], 1);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_suspend_kills_sessions_and_cache() {
    let state = create_state();
    let cache = state.cache.clone();
    let victim = state.auth.start_session(&alice()).await.unwrap();
    let ops = state.auth.start_session(&admin()).await.unwrap();
    let app = create_router(state);

    send(&app, get("/me", &victim.access_token)).await;
    cache.set(keys::user("user-1"), json!({ "id": "user-1" }), None).await;

    let response = send(
        &app,
        authed("POST", "/admin/users/user-1/suspend", &ops.access_token, json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["revokedTokens"], 1);
    assert_eq!(json["invalidatedEntries"], 2);

    let response = send(&app, refresh_request(&victim.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(create_state());

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"].as_str().unwrap(), "healthy");
    assert!(json.get("timestamp").is_some());
}
