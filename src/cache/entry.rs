//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A single cached value with the moment it was stored and its lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub data: V,
    /// When the value was stored
    pub created_at: Instant,
    /// How long the value stays fresh
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(data: V, ttl: Duration) -> Self {
        Self {
            data,
            created_at: Instant::now(),
            ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry stays fresh while `now - created_at <= ttl`, so it only
    /// expires once the elapsed time is strictly greater than the TTL.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`is_expired`](Self::is_expired) against an explicit clock reading.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    // == Time To Live ==
    /// Returns how long the entry has left before it goes stale.
    ///
    /// Returns `Duration::ZERO` once the entry has expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl
            .saturating_sub(Instant::now().saturating_duration_since(self.created_at))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("test_value", Duration::from_secs(60));

        assert_eq!(entry.data, "test_value");
        assert_eq!(entry.ttl, Duration::from_secs(60));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(1u32, Duration::from_millis(50));

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(80));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new((), Duration::from_secs(10));

        let remaining = entry.ttl_remaining();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining >= Duration::from_secs(9));
    }

    #[test]
    fn test_ttl_remaining_expired() {
        let entry = CacheEntry::new((), Duration::from_millis(20));

        sleep(Duration::from_millis(50));

        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("test", Duration::from_millis(100));

        // Exactly at the TTL the entry is still fresh
        let at_boundary = entry.created_at + Duration::from_millis(100);
        assert!(!entry.is_expired_at(at_boundary));

        let past_boundary = at_boundary + Duration::from_millis(1);
        assert!(entry.is_expired_at(past_boundary));
    }

    #[test]
    fn test_zero_ttl_is_fresh_only_at_creation() {
        let entry = CacheEntry::new("test", Duration::ZERO);

        assert!(!entry.is_expired_at(entry.created_at));
        assert!(entry.is_expired_at(entry.created_at + Duration::from_millis(1)));
    }
}
