//! Expired Entry Sweep
//!
//! Background task that periodically drops expired cache entries, so keys
//! that are never read again do not pile up.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TtlCache;

/// Spawns a task that calls [`TtlCache::cleanup_expired`] every `interval`.
///
/// The task loops until aborted through the returned handle.
///
/// # Example
/// ```ignore
/// let cache: TtlCache<String> = TtlCache::default();
/// let sweep = spawn_sweep_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweep.abort();
/// ```
pub fn spawn_sweep_task<V>(cache: TtlCache<V>, interval: Duration) -> JoinHandle<()>
where
    V: Send + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting cache sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup_expired();
            if removed > 0 {
                info!(removed, "cache sweep removed expired entries");
            } else {
                debug!("cache sweep found no expired entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_entries() {
        let cache = TtlCache::default();
        cache.set("expire_soon", 1, Duration::from_millis(100));
        cache.set("long_lived", 2, Duration::from_secs(3600));

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(250));
        tokio::time::sleep(Duration::from_millis(600)).await;

        // Removed without any read touching the key
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long_lived"), Some(2));
        assert_eq!(cache.stats().expirations, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let cache: TtlCache<u8> = TtlCache::default();

        let handle = spawn_sweep_task(cache, Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }
}
