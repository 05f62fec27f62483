//! Request DTOs for the gateway API
//!
//! Defines the structure of incoming query strings.

use serde::Deserialize;

/// Query string for cache invalidation (DELETE /cache)
///
/// # Fields
/// - `key`: Exact cache key to drop; every entry is dropped when absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateQuery {
    #[serde(default)]
    pub key: Option<String>,
}

impl InvalidateQuery {
    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match &self.key {
            Some(key) if key.is_empty() => Some("Key cannot be empty".to_string()),
            _ => None,
        }
    }
}
