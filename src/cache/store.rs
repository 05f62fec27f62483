//! Cache Store Module
//!
//! Single-owner cache engine: HashMap storage with lazy TTL expiration and an
//! optional LRU-enforced entry bound.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker, DEFAULT_TTL};

// == Cache Store ==
/// Key-value storage with per-entry TTL.
///
/// Expired entries are dropped when they are next read, or by
/// [`cleanup_expired`](Self::cleanup_expired). Without a bound the store
/// grows with every distinct key.
#[derive(Debug)]
pub struct CacheStore<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Present only when the store is bounded
    lru: Option<LruTracker>,
    stats: CacheStats,
    max_entries: Option<usize>,
    default_ttl: Duration,
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V> CacheStore<V> {
    // == Constructors ==
    /// Creates an unbounded store.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: None,
            stats: CacheStats::new(),
            max_entries: None,
            default_ttl,
        }
    }

    /// Creates a store holding at most `max_entries` entries.
    ///
    /// A bound of zero is treated as unbounded.
    pub fn bounded(default_ttl: Duration, max_entries: usize) -> Self {
        if max_entries == 0 {
            return Self::new(default_ttl);
        }
        Self {
            lru: Some(LruTracker::new()),
            max_entries: Some(max_entries),
            ..Self::new(default_ttl)
        }
    }

    // == Set ==
    /// Stores a value under `key`, replacing any existing entry and resetting its TTL.
    ///
    /// When bounded and full, the least recently used entry makes room for a new key.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();

        if let (Some(max), Some(lru)) = (self.max_entries, self.lru.as_mut()) {
            if !self.entries.contains_key(&key) && self.entries.len() >= max {
                if let Some(evicted) = lru.evict_oldest() {
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                    debug!(key = %evicted, "evicted least recently used entry");
                }
            }
            lru.touch(&key);
        }

        self.entries.insert(key, CacheEntry::new(value, ttl));
        self.stats.set_total_entries(self.entries.len());
    }

    /// Stores a value with the store's default TTL.
    pub fn set_default(&mut self, key: impl Into<String>, value: V) {
        let ttl = self.default_ttl;
        self.set(key, value, ttl);
    }

    // == Get ==
    /// Returns a reference to the value if present and fresh.
    ///
    /// A stale entry is removed and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!(key, "cache entry expired");
            return None;
        }

        self.stats.record_hit();
        if let Some(lru) = self.lru.as_mut() {
            lru.touch(key);
        }
        self.entries.get(key).map(|entry| &entry.data)
    }

    /// Returns the value if present and fresh, leaving stats, recency and
    /// stale entries untouched.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.data)
    }

    // == Has ==
    /// True if [`get`](Self::get) would return a value, with the same side effects.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Clear ==
    /// Removes `key`, or every entry when `key` is `None`.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self, key: Option<&str>) -> usize {
        let removed = match key {
            Some(key) => usize::from(self.remove_entry(key)),
            None => {
                let count = self.entries.len();
                self.entries.clear();
                if let Some(lru) = self.lru.as_mut() {
                    lru.clear();
                }
                count
            }
        };
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Cleanup Expired ==
    /// Removes every expired entry and returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        self.stats.set_total_entries(self.entries.len());
        expired_keys.len()
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Number of stored entries, including ones that expired but were not yet read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        if let Some(lru) = self.lru.as_mut() {
            lru.remove(key);
        }
        let removed = self.entries.remove(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn store() -> CacheStore<i32> {
        CacheStore::new(DEFAULT_TTL)
    }

    #[test]
    fn test_store_new() {
        let store = store();
        assert!(store.is_empty());
        assert_eq!(store.default_ttl(), Duration::from_millis(30_000));
        assert_eq!(store.max_entries(), None);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store();

        store.set("a", 42, Duration::from_millis(1000));

        assert_eq!(store.get("a"), Some(&42));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_peek_has_no_side_effects() {
        let mut store = CacheStore::bounded(DEFAULT_TTL, 2);
        store.set_default("a", 1);
        store.set_default("b", 2);

        assert_eq!(store.peek("a"), Some(&1));
        assert_eq!(store.peek("missing"), None);
        assert_eq!(store.stats().hits, 0);
        assert_eq!(store.stats().misses, 0);

        // "a" stays least recently used, so it is the one evicted
        store.set_default("c", 3);
        assert_eq!(store.peek("a"), None);
        assert_eq!(store.peek("b"), Some(&2));
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = store();
        assert_eq!(store.get("missing"), None);
        assert!(!store.has("missing"));
    }

    #[test]
    fn test_store_overwrite_resets_value() {
        let mut store = store();

        store.set_default("key", 1);
        store.set_default("key", 2);

        assert_eq!(store.get("key"), Some(&2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = store();

        store.set("a", 42, Duration::from_millis(1000));
        assert_eq!(store.get("a"), Some(&42));

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get("a"), None);
        assert!(!store.has("a"));
        // Lazily evicted on read
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_expired_entry_lingers_until_read() {
        let mut store = store();

        store.set("short", 1, Duration::from_millis(20));
        sleep(Duration::from_millis(50));

        assert_eq!(store.len(), 1);
        assert!(!store.has("short"));
        assert_eq!(store.len(), 0);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_clear_single_key() {
        let mut store = store();

        store.set_default("a", 1);
        store.set_default("b", 2);

        assert_eq!(store.clear(Some("a")), 1);
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some(&2));
        assert_eq!(store.clear(Some("a")), 0);
    }

    #[test]
    fn test_store_clear_all() {
        let mut store = store();

        store.set_default("a", 1);
        store.set_default("b", 2);
        store.set_default("c", 3);

        assert_eq!(store.clear(None), 3);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_unbounded_by_default() {
        let mut store = store();
        for i in 0..5_000 {
            store.set_default(format!("key{i}"), i);
        }
        assert_eq!(store.len(), 5_000);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = CacheStore::bounded(DEFAULT_TTL, 3);

        store.set_default("key1", 1);
        store.set_default("key2", 2);
        store.set_default("key3", 3);
        store.set_default("key4", 4);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.get("key4"), Some(&4));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = CacheStore::bounded(DEFAULT_TTL, 3);

        store.set_default("key1", 1);
        store.set_default("key2", 2);
        store.set_default("key3", 3);
        store.get("key1");
        store.set_default("key4", 4);

        assert_eq!(store.get("key1"), Some(&1));
        assert_eq!(store.get("key2"), None);
    }

    #[test]
    fn test_store_bounded_overwrite_does_not_evict() {
        let mut store = CacheStore::bounded(DEFAULT_TTL, 2);

        store.set_default("a", 1);
        store.set_default("b", 2);
        store.set_default("a", 10);

        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_zero_bound_is_unbounded() {
        let store: CacheStore<i32> = CacheStore::bounded(DEFAULT_TTL, 0);
        assert_eq!(store.max_entries(), None);
    }

    #[test]
    fn test_store_stats() {
        let mut store = store();

        store.set_default("key1", 1);
        store.get("key1");
        store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = store();

        store.set("key1", 1, Duration::from_millis(20));
        store.set("key2", 2, Duration::from_secs(10));

        sleep(Duration::from_millis(50));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key2"), Some(&2));
        assert_eq!(store.stats().expirations, 1);
    }
}
