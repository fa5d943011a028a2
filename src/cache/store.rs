//! TTL Cache Module
//!
//! Main cache engine combining HashMap storage with lazy TTL expiration and
//! least-recently-accessed eviction.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::keys;
use crate::cache::{CacheEntry, CacheStats, EntryInfo};

// == TTL Cache ==
/// In-memory key/value store with per-entry expiry and a capacity bound.
///
/// None of the operations fail: absence is reported as `None`, `false` or `0`.
#[derive(Debug)]
pub struct TtlCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
    /// Recency clock, bumped on every insert and read
    tick: u64,
}

impl<V: Clone> TtlCache<V> {
    // == Constructor ==
    /// Creates a new cache with the given capacity and default TTL.
    ///
    /// A capacity of zero is raised to one so that `set` can always store.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(capacity),
            capacity,
            default_ttl,
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed on the spot and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                debug!(key, "cache miss");
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!(key, "cache miss (expired)");
            return None;
        }

        let seq = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        entry.touch(seq);
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    // == Set ==
    /// Stores a value, replacing any previous one under the same key.
    ///
    /// Inserting a new key into a full cache evicts exactly one entry first.
    /// Overwrites never evict. `ttl = None` uses the default TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> bool {
        let key = key.into();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict();
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        let seq = self.next_tick();
        self.entries.insert(key, CacheEntry::new(value, ttl, seq));
        self.stats.record_set();
        true
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether something was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.record_deletes(1);
        }
        removed
    }

    // == Has ==
    /// Checks for a live entry without touching access metadata or hit/miss counters.
    ///
    /// An expired entry found here is purged.
    pub fn has(&mut self, key: &str) -> bool {
        match self.entries.get(key).map(CacheEntry::is_expired) {
            Some(true) => {
                self.entries.remove(key);
                self.stats.record_expirations(1);
                false
            }
            Some(false) => true,
            None => false,
        }
    }

    // == Get Or Insert ==
    /// Returns the cached value, or computes, stores and returns it.
    pub fn get_or_insert_with<F>(&mut self, key: &str, factory: F, ttl: Option<Duration>) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }

        let value = factory();
        self.set(key, value.clone(), ttl);
        value
    }

    // == Prefix Invalidation ==
    /// Removes every key starting with `prefix`. Returns the number removed.
    pub fn delete_by_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - self.entries.len();

        if removed > 0 {
            self.stats.record_deletes(removed);
            debug!(prefix, removed, "invalidated keys by prefix");
        }
        removed
    }

    /// Removes every key stored under the `tag:{tag}:` namespace.
    pub fn delete_by_tag(&mut self, tag: &str) -> usize {
        self.delete_by_prefix(&keys::tag_prefix(tag))
    }

    // == Cleanup ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.entries.len();

        self.stats.record_expirations(removed);
        removed
    }

    // == Evict ==
    /// Removes the single least recently accessed entry.
    ///
    /// Scans every entry (O(n)). Returns whether an entry was removed.
    pub fn evict(&mut self) -> bool {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access_seq)
            .map(|(key, _)| key.clone());

        match victim {
            Some(key) => {
                self.entries.remove(&key);
                self.stats.record_eviction();
                debug!(key = %key, "evicted least recently accessed entry");
                true
            }
            None => false,
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    /// Returns a metadata snapshot for a live entry without touching it.
    pub fn entry_info(&self, key: &str) -> Option<EntryInfo> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(EntryInfo::from)
    }

    /// Returns the keys currently stored, expired or not.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.record_deletes(removed);
        removed
    }

    // == Length ==
    /// Returns the current number of entries in the cache, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
