//! Short-lived markers for keys whose last origin fetch returned nothing.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use super::key::CacheKey;
use crate::clock::Clock;

#[derive(Debug)]
pub struct NegativeCache {
    markers: DashMap<CacheKey, DateTime<Utc>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl NegativeCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { markers: DashMap::new(), ttl, clock }
    }

    /// True while an unexpired marker exists. Expired markers are removed.
    pub fn is_negative(&self, key: &CacheKey) -> bool {
        let now = self.clock.now();
        let expires_at = self.markers.get(key).map(|m| *m.value());
        match expires_at {
            Some(at) if now < at => true,
            Some(_) => {
                self.markers.remove_if(key, |_, at| now >= *at);
                false
            }
            None => false,
        }
    }

    /// Set or extend the marker for `key`.
    pub fn mark(&self, key: &CacheKey) {
        let expires_at = self.clock.now() + self.ttl;
        self.markers.insert(key.clone(), expires_at);
    }

    pub fn clear(&self, key: &CacheKey) -> bool {
        self.markers.remove(key).is_some()
    }

    /// Drop markers for keys starting with `prefix`; empty clears all.
    pub fn clear_prefix(&self, prefix: &str) -> usize {
        let before = self.markers.len();
        self.markers.retain(|key, _| !key.to_string().starts_with(prefix));
        before.saturating_sub(self.markers.len())
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.markers.len();
        self.markers.retain(|_, at| now < *at);
        before.saturating_sub(self.markers.len())
    }

    /// Markers currently held, expired or not.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
