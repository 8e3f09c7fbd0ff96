//! Hot/cold classification of cache keys by recent request frequency.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use super::key::CacheKey;
use super::policy::CachePolicy;
use crate::clock::Clock;

#[derive(Debug, Clone, Copy)]
struct CallCounter {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Counts lookups per key inside a rolling window.
///
/// Counters live in a sharded map, so increments on different keys never
/// contend and increments on one key are serialized by its shard lock.
#[derive(Debug)]
pub struct FrequencyClassifier {
    counters: DashMap<CacheKey, CallCounter>,
    window: Duration,
    hot_threshold: u32,
    hot_ttl: Duration,
    cold_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FrequencyClassifier {
    pub fn new(policy: &CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: DashMap::new(),
            window: policy.counter_window,
            hot_threshold: policy.hot_threshold,
            hot_ttl: policy.hot_ttl,
            cold_ttl: policy.cold_ttl,
            clock,
        }
    }

    /// Count one lookup for `key`, opening a new window first if the current
    /// one has elapsed. Returns the count including this call.
    pub fn record_call(&self, key: &CacheKey) -> u32 {
        let now = self.clock.now();
        let mut counter = self
            .counters
            .entry(key.clone())
            .or_insert(CallCounter { count: 0, window_start: now });

        if now - counter.window_start >= self.window {
            counter.count = 0;
            counter.window_start = now;
        }
        counter.count = counter.count.saturating_add(1);
        counter.count
    }

    /// Calls recorded in the current window; zero for unknown keys.
    pub fn count(&self, key: &CacheKey) -> u32 {
        let now = self.clock.now();
        self.counters
            .get(key)
            .filter(|c| now - c.window_start < self.window)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    pub fn is_hot(&self, key: &CacheKey) -> bool {
        self.count(key) >= self.hot_threshold
    }

    /// Logical TTL for a freshly written entry.
    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        if self.is_hot(key) { self.hot_ttl } else { self.cold_ttl }
    }

    pub fn hot_threshold(&self) -> u32 {
        self.hot_threshold
    }

    /// Forget counters for keys starting with `prefix`; empty clears all.
    pub fn reset(&self, prefix: &str) -> usize {
        let before = self.counters.len();
        self.counters.retain(|key, _| !key.to_string().starts_with(prefix));
        before.saturating_sub(self.counters.len())
    }

    /// Drop counters whose window has elapsed.
    pub fn purge_elapsed(&self) -> usize {
        let now = self.clock.now();
        let before = self.counters.len();
        self.counters.retain(|_, c| now - c.window_start < self.window);
        before.saturating_sub(self.counters.len())
    }

    /// Live counts, sorted by key.
    pub fn snapshot(&self) -> Vec<(CacheKey, u32)> {
        let now = self.clock.now();
        let mut counts: Vec<_> = self
            .counters
            .iter()
            .filter(|c| now - c.window_start < self.window)
            .map(|c| (c.key().clone(), c.count))
            .collect();
        counts.sort_by_key(|(key, _)| key.to_string());
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::Direction;
    use crate::clock::ManualClock;

    fn classifier(clock: &ManualClock) -> FrequencyClassifier {
        FrequencyClassifier::new(&CachePolicy::default(), Arc::new(clock.clone()))
    }

    fn key(code: &str) -> CacheKey {
        CacheKey::new(code, Direction::Departures).unwrap()
    }

    #[test]
    fn test_unknown_key_is_cold() {
        let clock = ManualClock::default();
        let freq = classifier(&clock);
        assert_eq!(freq.count(&key("SGN")), 0);
        assert!(!freq.is_hot(&key("SGN")));
        assert_eq!(freq.ttl_for(&key("SGN")), Duration::minutes(5));
    }

    #[test]
    fn test_becomes_hot_at_threshold() {
        let clock = ManualClock::default();
        let freq = classifier(&clock);

        assert_eq!(freq.record_call(&key("SGN")), 1);
        assert!(!freq.is_hot(&key("SGN")));

        assert_eq!(freq.record_call(&key("SGN")), 2);
        assert!(freq.is_hot(&key("SGN")));
        assert_eq!(freq.ttl_for(&key("SGN")), Duration::minutes(30));
    }

    #[test]
    fn test_keys_are_independent() {
        let clock = ManualClock::default();
        let freq = classifier(&clock);
        freq.record_call(&key("SGN"));
        freq.record_call(&key("SGN"));
        freq.record_call(&key("HAN"));

        assert!(freq.is_hot(&key("SGN")));
        assert!(!freq.is_hot(&key("HAN")));

        let arrivals = CacheKey::new("SGN", Direction::Arrivals).unwrap();
        assert_eq!(freq.count(&arrivals), 0);
    }

    #[test]
    fn test_window_reset() {
        let clock = ManualClock::default();
        let freq = classifier(&clock);
        freq.record_call(&key("SGN"));
        freq.record_call(&key("SGN"));

        clock.advance(Duration::minutes(31));

        assert_eq!(freq.count(&key("SGN")), 0);
        assert!(!freq.is_hot(&key("SGN")));
        assert_eq!(freq.record_call(&key("SGN")), 1);
    }

    #[test]
    fn test_reset_by_prefix() {
        let clock = ManualClock::default();
        let freq = classifier(&clock);
        freq.record_call(&key("SGN"));
        freq.record_call(&CacheKey::new("SGN", Direction::Arrivals).unwrap());
        freq.record_call(&key("HAN"));

        assert_eq!(freq.reset("SGN:"), 2);
        assert_eq!(freq.count(&key("HAN")), 1);
        assert_eq!(freq.reset(""), 1);
    }

    #[test]
    fn test_purge_elapsed_and_snapshot() {
        let clock = ManualClock::default();
        let freq = classifier(&clock);
        freq.record_call(&key("SGN"));
        clock.advance(Duration::minutes(20));
        freq.record_call(&key("HAN"));
        freq.record_call(&key("HAN"));
        clock.advance(Duration::minutes(15));

        let snapshot = freq.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0.to_string(), "HAN:departures");
        assert_eq!(snapshot[0].1, 2);

        assert_eq!(freq.purge_elapsed(), 1);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let clock = ManualClock::default();
        let freq = Arc::new(classifier(&clock));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let freq = Arc::clone(&freq);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        freq.record_call(&key("SGN"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(freq.count(&key("SGN")), 2000);
    }
}
