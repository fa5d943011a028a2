//! Cleanup Tasks
//!
//! Background tasks that periodically remove expired cache entries and
//! expired refresh token records.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::AuthService;
use crate::cache::SharedCache;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task sleeps for `interval`, then takes the write lock and runs
/// `cleanup()`. Sweeps run one after another inside the same task, so two
/// sweeps never overlap.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(TtlCache::<String>::new(1000, Duration::from_secs(300))));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(cache: SharedCache<V>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut cache_guard = cache.write().await;
                cache_guard.cleanup()
            };

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

/// Spawns a background task that periodically drops expired refresh token records.
pub fn spawn_refresh_purge_task(auth: Arc<AuthService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            match auth.purge_expired().await {
                Ok(0) => debug!("Refresh purge: nothing to drop"),
                Ok(removed) => info!("Refresh purge: dropped {} expired records", removed),
                Err(e) => warn!("Refresh purge failed: {}", e),
            }
        }
    })
}
