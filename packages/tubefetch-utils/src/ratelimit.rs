//! Minimum-interval throttling keyed by an arbitrary value.
//!
//! Each key keeps only the instant of its last permitted update, so two keys
//! never influence each other. The caller supplies `now`, which keeps the
//! limiter free of any clock and trivially testable.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Default interval between two surfaced updates for the same key.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct RateLimiter<K> {
    interval: Duration,
    last_permitted: HashMap<K, Instant>,
}

impl<K: Hash + Eq> RateLimiter<K> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_permitted: HashMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` when an update for `key` may be surfaced at `now`.
    ///
    /// A permitted call records `now` as the key's last update; a rejected
    /// call leaves the state untouched. The first call for a key is always
    /// permitted.
    pub fn check(&mut self, now: Instant, key: K) -> bool {
        match self.last_permitted.get(&key) {
            Some(last) if now.saturating_duration_since(*last) < self.interval => false,
            _ => {
                self.last_permitted.insert(key, now);
                true
            }
        }
    }

    /// Drop the state kept for `key`.
    pub fn forget(&mut self, key: &K) {
        self.last_permitted.remove(key);
    }

    /// Drop every key matching the predicate.
    pub fn forget_where(&mut self, mut predicate: impl FnMut(&K) -> bool) {
        self.last_permitted.retain(|key, _| !predicate(key));
    }

    pub fn tracked_keys(&self) -> usize {
        self.last_permitted.len()
    }
}

impl<K: Hash + Eq> Default for RateLimiter<K> {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}
