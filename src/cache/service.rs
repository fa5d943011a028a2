//! Cache Service
//!
//! Clonable handle around a [`TtlCache`] shared by request handlers, with the
//! periodic sweep tied to explicit start/stop calls.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheStats, EntryInfo, TtlCache};
use crate::tasks::spawn_cleanup_task;

/// Cache store shared between the service handle and the sweeper task.
pub type SharedCache<V> = Arc<RwLock<TtlCache<V>>>;

// == Cache Service ==
/// Process-wide cache handle injected into request handling code.
///
/// Every mutation goes through the methods below; no caller sees the entry map.
#[derive(Clone)]
pub struct CacheService<V> {
    store: SharedCache<V>,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<V> CacheService<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self::from_store(TtlCache::new(capacity, default_ttl))
    }

    pub fn from_store(store: TtlCache<V>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Builds the service from application configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.max_entries, config.default_ttl())
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        // Write lock: a hit updates access metadata
        self.store.write().await.get(key)
    }

    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> bool {
        self.store.write().await.set(key, value, ttl)
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    pub async fn has(&self, key: &str) -> bool {
        self.store.write().await.has(key)
    }

    pub async fn delete_by_prefix(&self, prefix: &str) -> usize {
        self.store.write().await.delete_by_prefix(prefix)
    }

    pub async fn delete_by_tag(&self, tag: &str) -> usize {
        self.store.write().await.delete_by_tag(tag)
    }

    pub async fn cleanup(&self) -> usize {
        self.store.write().await.cleanup()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn entry_info(&self, key: &str) -> Option<EntryInfo> {
        self.store.read().await.entry_info(key)
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    // == Get Or Set ==
    /// Returns the cached value or runs `factory`, stores its output and returns it.
    ///
    /// The lock is released while the factory runs, so concurrent misses on the
    /// same key may each run the factory; the last write wins.
    pub async fn get_or_set<F, Fut>(&self, key: &str, factory: F, ttl: Option<Duration>) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(key).await {
            return value;
        }

        let value = factory().await;
        self.set(key, value.clone(), ttl).await;
        value
    }

    /// Like [`get_or_set`](Self::get_or_set) for fallible factories. Errors are not cached.
    pub async fn try_get_or_set<F, Fut, E>(
        &self,
        key: &str,
        factory: F,
        ttl: Option<Duration>,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = factory().await?;
        self.set(key, value.clone(), ttl).await;
        Ok(value)
    }

    // == Sweeper Lifecycle ==
    /// Starts the periodic sweep. Returns false if one is already running.
    pub fn start_sweeper(&self, interval: Duration) -> bool {
        let mut sweeper = self.sweeper_slot();
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        *sweeper = Some(spawn_cleanup_task(self.store.clone(), interval));
        true
    }

    /// Stops the periodic sweep. Returns false if none was running.
    pub fn stop_sweeper(&self) -> bool {
        match self.sweeper_slot().take() {
            Some(handle) => {
                handle.abort();
                info!("Cache sweeper stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn sweeper_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sweeper
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
