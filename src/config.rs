//! Configuration Module
//!
//! Loads gateway and cache settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL in milliseconds for cached responses
    pub default_ttl_ms: u64,
    /// Entry bound for the cache, 0 = unbounded
    pub max_entries: usize,
    /// Interval of the expired-entry sweep in milliseconds, 0 = disabled
    pub sweep_interval_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the REST backend
    pub upstream_url: String,
    /// Request timeout for the REST backend in milliseconds
    pub upstream_timeout_ms: u64,
    /// Mount the unauthenticated `DELETE /cache` and `DELETE /pending` routes
    pub admin_endpoints: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL_MS` - Cache TTL (default: 30000)
    /// - `MAX_ENTRIES` - Cache entry bound (default: 0, unbounded)
    /// - `SWEEP_INTERVAL_MS` - Expired entry sweep interval (default: 0, disabled)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - REST backend base URL (default: http://localhost:8000/api/v1)
    /// - `UPSTREAM_TIMEOUT_MS` - REST backend timeout (default: 10000)
    /// - `ADMIN_ENDPOINTS` - Mount the cache admin routes (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl_ms: env_or("DEFAULT_TTL_MS", defaults.default_ttl_ms),
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            sweep_interval_ms: env_or("SWEEP_INTERVAL_MS", defaults.sweep_interval_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            upstream_url: env::var("UPSTREAM_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.upstream_url),
            upstream_timeout_ms: env_or("UPSTREAM_TIMEOUT_MS", defaults.upstream_timeout_ms),
            admin_endpoints: env_or("ADMIN_ENDPOINTS", defaults.admin_endpoints),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    /// Sweep interval, or `None` when the sweep is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_ms > 0).then(|| Duration::from_millis(self.sweep_interval_ms))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl_ms: 30_000,
            max_entries: 0,
            sweep_interval_ms: 0,
            server_port: 3000,
            upstream_url: "http://localhost:8000/api/v1".to_string(),
            upstream_timeout_ms: 10_000,
            admin_endpoints: false,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
