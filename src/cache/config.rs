//! Cache configuration.

use std::time::Duration;

/// Configuration for a cache instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// Time-to-live for cache entries.
    /// `None` keeps entries until they are invalidated.
    pub ttl: Option<Duration>,

    /// Time-to-idle for cache entries.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(600)), // 10 minutes
            tti: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given max capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    /// Set time-to-live for cache entries.
    ///
    /// A zero duration means "never expires by age".
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = (!duration.is_zero()).then_some(duration);
        self
    }

    /// Set time-to-idle for cache entries.
    #[must_use]
    pub fn tti(mut self, duration: Duration) -> Self {
        self.tti = (!duration.is_zero()).then_some(duration);
        self
    }

    /// Config used by entity repositories: capacity plus the global TTL.
    pub fn entities(max_capacity: u64, ttl: Duration) -> Self {
        Self::with_capacity(max_capacity).ttl(ttl)
    }
}
