//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Refresh Purge: Drops expired refresh token records

mod cleanup;

pub use cleanup::{spawn_cleanup_task, spawn_refresh_purge_task};
