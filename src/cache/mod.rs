//! Cache Module
//!
//! In-memory caching with lazy TTL expiration and an optional LRU bound.

mod entry;
mod handle;
mod lru;
mod stats;
mod store;


use std::time::Duration;

// Re-export public types
pub use entry::CacheEntry;
pub use handle::TtlCache;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// TTL applied when a caller does not supply one
pub const DEFAULT_TTL: Duration = Duration::from_millis(30_000);
