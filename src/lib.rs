//! Reno Core - cache and session core of a renovation-quoting backend
//!
//! In-process TTL cache with prefix/tag invalidation, JWT access/refresh
//! token lifecycle with rotation, and a client-side single-flight refresh
//! coordinator.

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
