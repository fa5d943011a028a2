//! API Routes
//!
//! Configures the Axum router: public auth endpoints, bearer-protected user
//! endpoints and admin-only cache administration.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::cache_layer::{cache_responses, ResponseCache};
use super::handlers::{
    cache_stats_handler, cleanup_handler, delete_key_handler, delete_prefix_handler,
    delete_tag_handler, health_handler, logout_handler, me_handler, refresh_handler,
    suspend_handler, AppState,
};
use crate::auth::{require_admin, require_auth};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `POST /refresh` - Exchange a refresh token for a new pair
/// - `POST /logout` - End the caller's session (bearer)
/// - `GET /me` - Caller identity, response-cached (bearer)
/// - `GET /cache/stats` - Cache statistics (admin)
/// - `DELETE /cache/key/*key` - Delete one key (admin)
/// - `DELETE /cache/prefix/*prefix` - Delete keys by prefix (admin)
/// - `DELETE /cache/tag/:tag` - Delete keys by tag (admin)
/// - `POST /cache/cleanup` - Sweep expired entries now (admin)
/// - `POST /admin/users/:id/suspend` - Revoke a user's sessions (admin)
///
/// # Middleware
/// - Bearer auth on everything except `/health` and `/refresh`
/// - Response cache on `GET /me`
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let response_cache = ResponseCache::new(state.cache.clone(), state.response_ttl);

    let cached = Router::new()
        .route("/me", get(me_handler))
        .route_layer(from_fn_with_state(response_cache, cache_responses));

    let admin = Router::new()
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache/key/*key", delete(delete_key_handler))
        .route("/cache/prefix/*prefix", delete(delete_prefix_handler))
        .route("/cache/tag/:tag", delete(delete_tag_handler))
        .route("/cache/cleanup", post(cleanup_handler))
        .route("/admin/users/:id/suspend", post(suspend_handler))
        .route_layer(from_fn(require_admin));

    // Auth runs before the cache and admin layers added above
    let protected = Router::new()
        .route("/logout", post(logout_handler))
        .merge(cached)
        .merge(admin)
        .route_layer(from_fn_with_state(state.auth.clone(), require_auth));

    Router::new()
        .route("/health", get(health_handler))
        .route("/refresh", post(refresh_handler))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
