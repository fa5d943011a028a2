//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access tracking.

use std::time::{Duration, Instant};

/// Smallest TTL an entry can be stored with. Keeps `expires_at > created_at`.
pub const MIN_TTL: Duration = Duration::from_millis(1);

/// Largest TTL an entry can be stored with (100 years). Longer TTLs, up to
/// `Duration::MAX`, mean "never expire" and are clamped here.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion instant
    pub created_at: Instant,
    /// Absolute expiry instant (`created_at + ttl`)
    pub expires_at: Instant,
    /// Number of successful reads since insertion
    pub access_count: u64,
    /// Instant of the last successful read (or insertion)
    pub last_accessed_at: Instant,
    /// Recency stamp from the owning store; larger means more recently used
    pub last_access_seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Time to live, clamped to [`MIN_TTL`]..=[`MAX_TTL`]
    /// * `seq` - Recency stamp assigned by the store
    pub fn new(value: V, ttl: Duration, seq: u64) -> Self {
        Self::new_at(value, ttl, seq, Instant::now())
    }

    /// Creates a new cache entry as if inserted at `now`.
    pub fn new_at(value: V, ttl: Duration, seq: u64, now: Instant) -> Self {
        let ttl = ttl.clamp(MIN_TTL, MAX_TTL);
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(MIN_TTL))
            .unwrap_or(now);

        Self {
            value,
            created_at: now,
            expires_at,
            access_count: 0,
            last_accessed_at: now,
            last_access_seq: seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is strictly past `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expiry predicate shared by lazy expiry and the periodic sweep.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, seq: u64) {
        self.access_count += 1;
        self.last_accessed_at = Instant::now();
        self.last_access_seq = seq;
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, `Duration::ZERO` once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

// == Entry Info ==
/// Read-only snapshot of an entry's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub access_count: u64,
    pub age: Duration,
    pub ttl_remaining: Duration,
    pub idle: Duration,
}

impl<V> From<&CacheEntry<V>> for EntryInfo {
    fn from(entry: &CacheEntry<V>) -> Self {
        let now = Instant::now();
        Self {
            access_count: entry.access_count,
            age: now.saturating_duration_since(entry.created_at),
            ttl_remaining: entry.expires_at.saturating_duration_since(now),
            idle: now.saturating_duration_since(entry.last_accessed_at),
        }
    }
}
