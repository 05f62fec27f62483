//! Request Deduplication
//!
//! Collapses concurrent requests for the same key into one underlying
//! operation. The first caller starts the fetch; later callers join it until
//! it settles.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::error::FetchError;

/// Handle to the eventual outcome of a shared fetch.
///
/// Cloneable; every clone resolves to the same value or the same error.
pub type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;

// == Dedupe Stats ==
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupeStats {
    /// Fetches actually started
    pub started: u64,
    /// Calls that attached to an existing in-flight fetch
    pub joined: u64,
    /// Fetches aborted through `cancel`
    pub cancelled: u64,
    /// Fetches currently registered
    pub in_flight: usize,
}

struct Pending<V> {
    id: u64,
    fetch: SharedFetch<V>,
    abort: AbortHandle,
}

struct Registry<V> {
    pending: HashMap<String, Pending<V>>,
    next_id: u64,
    stats: DedupeStats,
}

impl<V> Registry<V> {
    /// Drops the registration for `key` only if it is still generation `id`.
    fn settle(&mut self, key: &str, id: u64) {
        if self.pending.get(key).is_some_and(|p| p.id == id) {
            self.pending.remove(key);
            debug!(key, "in-flight fetch settled");
        }
    }
}

/// Unregisters its fetch when the spawned task finishes, panics or is aborted.
struct SettleGuard<V> {
    registry: Arc<Mutex<Registry<V>>>,
    key: String,
    id: u64,
}

impl<V> Drop for SettleGuard<V> {
    fn drop(&mut self) {
        self.registry.lock().settle(&self.key, self.id);
    }
}

// == Deduplicator ==
/// Registry of in-flight fetches keyed by string.
///
/// Clones share the same registry.
pub struct Deduplicator<V> {
    registry: Arc<Mutex<Registry<V>>>,
}

impl<V> Clone for Deduplicator<V> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<V> Default for Deduplicator<V> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                pending: HashMap::new(),
                next_id: 0,
                stats: DedupeStats::default(),
            })),
        }
    }
}

impl<V> std::fmt::Debug for Deduplicator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deduplicator")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl<V> Deduplicator<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every in-flight registration without cancelling the work.
    ///
    /// Callers that already joined still receive the outcome; new callers
    /// start fresh fetches. Returns how many registrations were dropped.
    pub fn clear_pending_requests(&self) -> usize {
        let mut registry = self.registry.lock();
        let count = registry.pending.len();
        registry.pending.clear();
        debug!(count, "cleared pending requests");
        count
    }

    /// Unregisters `key` and aborts its fetch.
    ///
    /// Every joined caller resolves to [`FetchError::Cancelled`]. Returns
    /// false when nothing was in flight for `key`.
    pub fn cancel(&self, key: &str) -> bool {
        let pending = {
            let mut registry = self.registry.lock();
            let pending = registry.pending.remove(key);
            if pending.is_some() {
                registry.stats.cancelled += 1;
            }
            pending
        };

        match pending {
            Some(pending) => {
                // Abort outside the lock; the task's guard takes it on drop
                pending.abort.abort();
                warn!(key, "cancelled in-flight fetch");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.registry.lock().pending.contains_key(key)
    }

    pub fn in_flight(&self) -> usize {
        self.registry.lock().pending.len()
    }

    pub fn stats(&self) -> DedupeStats {
        let registry = self.registry.lock();
        DedupeStats {
            in_flight: registry.pending.len(),
            ..registry.stats.clone()
        }
    }
}

impl<V> Deduplicator<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Dedupe ==
    /// Runs `fetcher` for `key` unless a fetch for `key` is already in flight.
    ///
    /// The lookup and the registration happen under one lock, so at most one
    /// fetch per key is ever in flight. The fetch is spawned onto the tokio
    /// runtime and completes even if every caller drops its handle. It is
    /// unregistered as soon as it settles, so the next call after that
    /// starts over.
    ///
    /// `fetcher` is invoked while the registry lock is held: it should only
    /// build its future and must not call back into this deduplicator.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn dedupe<F, Fut>(&self, key: &str, fetcher: F) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let mut registry = self.registry.lock();

        if let Some(pending) = registry.pending.get(key) {
            let fetch = pending.fetch.clone();
            registry.stats.joined += 1;
            debug!(key, "joined in-flight fetch");
            return fetch;
        }

        let id = registry.next_id;
        registry.next_id += 1;
        registry.stats.started += 1;

        let guard = SettleGuard {
            registry: Arc::clone(&self.registry),
            key: key.to_string(),
            id,
        };
        let operation = fetcher();
        let task = tokio::spawn(async move {
            let _guard = guard;
            operation.await
        });
        let abort = task.abort_handle();

        let owned_key = key.to_string();
        let fetch = async move {
            match task.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(FetchError::failed(err)),
                Err(join_err) if join_err.is_cancelled() => Err(FetchError::Cancelled(owned_key)),
                Err(join_err) => {
                    warn!(key = %owned_key, "fetch panicked");
                    Err(FetchError::Panicked(join_err.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        registry.pending.insert(
            key.to_string(),
            Pending {
                id,
                fetch: fetch.clone(),
                abort,
            },
        );
        debug!(key, "started fetch");
        fetch
    }
}
