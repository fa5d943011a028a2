//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, writes and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of stored values (inserts and overwrites)
    pub sets: u64,
    /// Number of entries removed through `delete`, prefix or tag invalidation
    pub deletes: u64,
    /// Number of entries evicted due to capacity pressure
    pub evictions: u64,
    /// Number of expired entries purged lazily or by the sweep
    pub expirations: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Configured maximum number of entries
    pub capacity: usize,
    /// hits / (hits + misses), 0 when no reads happened
    pub hit_rate: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn compute_hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_deletes(&mut self, count: usize) {
        self.deletes += count as u64;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    // == Snapshot ==
    /// Returns a copy with derived fields (entry count, hit rate) filled in.
    pub fn snapshot(&self, total_entries: usize) -> Self {
        let mut stats = self.clone();
        stats.total_entries = total_entries;
        stats.hit_rate = self.compute_hit_rate();
        stats
    }
}
