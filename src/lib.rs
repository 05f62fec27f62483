//! Fetch Cache - TTL caching with request deduplication
//!
//! Provides an in-memory TTL cache, a deduplicator that collapses concurrent
//! fetches for the same key, their composition, and an HTTP gateway that puts
//! them in front of a REST backend.

pub mod api;
pub mod cache;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use cache::{CacheStore, TtlCache, DEFAULT_TTL};
pub use config::Config;
pub use dedupe::{Deduplicator, SharedFetch};
pub use error::FetchError;
pub use fetcher::CachedFetcher;
pub use tasks::spawn_sweep_task;
