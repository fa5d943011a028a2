//! API Module
//!
//! HTTP handlers, routing and the response cache middleware.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `POST /refresh` - Rotate a refresh token
//! - `POST /logout` - End a session
//! - `GET /me` - Caller identity
//! - `/cache/*`, `/admin/*` - Cache and account administration (admin role)

pub mod cache_layer;
pub mod handlers;
pub mod routes;

pub use cache_layer::{cache_responses, ResponseCache, X_CACHE};
pub use handlers::*;
pub use routes::create_router;
