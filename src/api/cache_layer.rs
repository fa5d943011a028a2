//! Response Cache Middleware
//!
//! Read-through cache for JSON GET responses, keyed per subject so one
//! user's rendering is never served to another.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::AccessClaims;
use crate::cache::{keys, CacheService};

/// Header telling clients whether the body came from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Subject used for requests that reach the layer unauthenticated.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// Largest body the layer will buffer for caching. Bigger or unsized bodies
/// pass through uncached.
const MAX_CACHED_BODY: usize = 1024 * 1024;

/// State of the response cache layer.
#[derive(Clone)]
pub struct ResponseCache {
    pub cache: CacheService<Value>,
    /// TTL of stored responses; `None` falls back to the cache default
    pub ttl: Option<Duration>,
}

impl ResponseCache {
    pub fn new(cache: CacheService<Value>, ttl: Option<Duration>) -> Self {
        Self { cache, ttl }
    }
}

/// Serves GET requests from the cache, storing successful JSON responses on a miss.
pub async fn cache_responses(
    State(layer): State<ResponseCache>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let subject = req
        .extensions()
        .get::<AccessClaims>()
        .map(|claims| claims.sub.as_str())
        .unwrap_or(ANONYMOUS_SUBJECT);
    let key = keys::response(subject, req.method().as_str(), &req.uri().to_string());

    if let Some(body) = layer.cache.get(&key).await {
        debug!(key = %key, "response cache hit");
        return with_cache_header(Json(body).into_response(), "HIT");
    }

    let response = next.run(req).await;
    if response.status() != StatusCode::OK || !is_json(&response) {
        return response;
    }

    if !fits_in_cache(&response) {
        debug!(key = %key, "response too large to cache, passing through");
        return with_cache_header(response, "MISS");
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %key, error = %e, "response body not cacheable");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => {
            layer.cache.set(key.clone(), value, layer.ttl).await;
            debug!(key = %key, "response cache miss, stored");
        }
        Err(e) => warn!(key = %key, error = %e, "handler returned malformed JSON"),
    }

    with_cache_header(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

/// Only bodies with a known size under the limit are buffered.
fn fits_in_cache(response: &Response) -> bool {
    response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_CACHED_BODY as u64)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

fn with_cache_header(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(status));
    response
}
