//! Shared Cache Handle
//!
//! Cloneable, thread-safe front for a [`CacheStore`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cache::{CacheStats, CacheStore, DEFAULT_TTL};

// == TTL Cache ==
/// A process-local TTL cache that can be cloned into every consumer.
///
/// All clones share the same underlying store. The lock is only held for the
/// duration of a single synchronous operation.
#[derive(Debug)]
pub struct TtlCache<V> {
    store: Arc<Mutex<CacheStore<V>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V> TtlCache<V> {
    /// Creates an unbounded cache.
    pub fn new(default_ttl: Duration) -> Self {
        Self::from_store(CacheStore::new(default_ttl))
    }

    /// Creates a cache that evicts least recently used entries past `max_entries`.
    pub fn bounded(default_ttl: Duration, max_entries: usize) -> Self {
        Self::from_store(CacheStore::bounded(default_ttl, max_entries))
    }

    /// Wraps an existing store.
    pub fn from_store(store: CacheStore<V>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.store.lock().set(key, value, ttl);
    }

    /// Stores `value` under `key` with the cache's default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.store.lock().set_default(key, value);
    }

    // == Has ==
    /// True if a fresh entry exists. Counts as a lookup in the stats, and a
    /// stale entry is removed.
    pub fn has(&self, key: &str) -> bool {
        self.store.lock().has(key)
    }

    // == Clear ==
    /// Removes `key`, or everything when `None`. Returns the number removed.
    pub fn clear(&self, key: Option<&str>) -> usize {
        self.store.lock().clear(key)
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        self.store.lock().cleanup_expired()
    }

    // == Introspection ==
    /// Snapshot of the hit, miss and eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn default_ttl(&self) -> Duration {
        self.store.lock().default_ttl()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

impl<V: Clone> TtlCache<V> {
    // == Get ==
    /// Returns a clone of the cached value if present and fresh.
    ///
    /// Records a hit or miss, and removes the entry if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.store.lock().get(key).cloned()
    }

    /// Like [`get`](Self::get), without touching stats, recency or stale
    /// entries.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.store.lock().peek(key).cloned()
    }
}
