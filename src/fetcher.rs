//! Cached Fetcher
//!
//! Composes the TTL cache with the deduplicator: check the cache, otherwise
//! join or start a single fetch for the key and store its result.

use std::future::Future;
use std::time::Duration;

use futures::future::{self, FutureExt};
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::dedupe::{Deduplicator, SharedFetch};
use crate::error::FetchError;

// == Cached Fetcher ==
/// Cache plus deduplicator for one value type.
///
/// Built once by the application and cloned into consumers; clones share
/// both the cache and the in-flight registry.
#[derive(Debug)]
pub struct CachedFetcher<V> {
    cache: TtlCache<V>,
    dedupe: Deduplicator<V>,
}

impl<V> Clone for CachedFetcher<V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            dedupe: self.dedupe.clone(),
        }
    }
}

impl<V> Default for CachedFetcher<V> {
    fn default() -> Self {
        Self::new(TtlCache::default(), Deduplicator::new())
    }
}

impl<V> CachedFetcher<V> {
    pub fn new(cache: TtlCache<V>, dedupe: Deduplicator<V>) -> Self {
        Self { cache, dedupe }
    }

    /// Builds a fetcher whose cache uses the configured TTL and entry bound.
    pub fn from_config(config: &Config) -> Self {
        let cache = match config.max_entries {
            0 => TtlCache::new(config.default_ttl()),
            max => TtlCache::bounded(config.default_ttl(), max),
        };
        Self::new(cache, Deduplicator::new())
    }

    pub fn cache(&self) -> &TtlCache<V> {
        &self.cache
    }

    pub fn deduplicator(&self) -> &Deduplicator<V> {
        &self.dedupe
    }
}

impl<V> CachedFetcher<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == With Cache ==
    /// Returns the cached value for `key`, or fetches it once and caches it.
    ///
    /// A cache hit never invokes `fetcher`. On a miss, concurrent callers for
    /// the same key share one fetch, and a successful result is stored for
    /// `ttl` (the cache default when `None`). Failures are not cached.
    pub async fn with_cache<F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        ttl: Option<Duration>,
    ) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        if let Some(hit) = self.cache.get(key) {
            debug!(key, "cache hit");
            return Ok(hit);
        }
        debug!(key, "cache miss");

        self.fetch_into_cache(key, fetcher, ttl).await
    }

    /// Joins or starts the shared fetch for `key` after a cache miss.
    ///
    /// The cache is read again while the deduplicator holds its registry
    /// lock. A fetch that stored its value and settled between the caller's
    /// miss and this point is then served from the cache instead of being
    /// repeated.
    fn fetch_into_cache<F, Fut>(&self, key: &str, fetcher: F, ttl: Option<Duration>) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let cache = self.cache.clone();
        let ttl = ttl.unwrap_or_else(|| cache.default_ttl());
        let owned_key = key.to_string();

        self.dedupe.dedupe(key, move || {
            let cached = cache.peek(&owned_key);
            match cached {
                Some(hit) => future::ready(Ok::<V, anyhow::Error>(hit)).left_future(),
                None => {
                    let operation = fetcher();
                    async move {
                        let data = operation.await?;
                        cache.set(owned_key, data.clone(), ttl);
                        Ok::<V, anyhow::Error>(data)
                    }
                    .right_future()
                }
            }
        })
    }

    /// [`with_cache`](Self::with_cache) with the cache's default TTL.
    pub async fn with_cache_default<F, Fut>(&self, key: &str, fetcher: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.with_cache(key, fetcher, None).await
    }
}
