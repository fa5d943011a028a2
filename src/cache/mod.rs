//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, least-recently-accessed
//! eviction and prefix/tag invalidation.

mod entry;
pub mod keys;
mod service;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, EntryInfo, MAX_TTL, MIN_TTL};
pub use service::{CacheService, SharedCache};
pub use stats::CacheStats;
pub use store::TtlCache;

// == Public Constants ==
/// Default maximum number of entries
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default time to live (5 minutes)
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default interval between sweeps of expired entries
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
