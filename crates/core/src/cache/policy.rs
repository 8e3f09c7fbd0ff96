//! TTL and timeout policy for the flight cache.

use chrono::Duration;

/// Tunables for classification, expiry and origin timeouts.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Length of the call-counting window.
    pub counter_window: Duration,
    /// Calls within the window at which a key counts as hot.
    pub hot_threshold: u32,
    /// Logical TTL for hot keys.
    pub hot_ttl: Duration,
    /// Logical TTL for cold keys.
    pub cold_ttl: Duration,
    /// Hard cutoff after which an entry is never served.
    pub physical_ttl: Duration,
    /// Lifetime of a negative marker.
    pub negative_ttl: Duration,
    /// Upper bound on a blocking origin fetch.
    pub fetch_timeout: std::time::Duration,
    /// Upper bound on a whole background refresh.
    pub refresh_timeout: std::time::Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            counter_window: Duration::minutes(30),
            hot_threshold: 2,
            hot_ttl: Duration::minutes(30),
            cold_ttl: Duration::minutes(5),
            physical_ttl: Duration::minutes(60),
            negative_ttl: Duration::minutes(5),
            fetch_timeout: std::time::Duration::from_secs(10),
            refresh_timeout: std::time::Duration::from_secs(30),
        }
    }
}
