use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Sliding-window limiter keyed by guild.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    hits: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: DashMap::new(),
        }
    }

    /// Record a hit for `key` unless `limit` hits already happened within
    /// the window. Returns whether the hit was recorded.
    pub fn try_acquire(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.entry(key.to_string()).or_default();

        hits.retain(|&t| now.duration_since(t) < self.window);
        if hits.len() >= self.limit {
            return false;
        }

        hits.push(now);
        true
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
