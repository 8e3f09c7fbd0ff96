//! The flight cache: lookup state machine and background refresh.
//!
//! A lookup ends in one of four states:
//!
//! - negative hit: the key recently produced no flights, answer empty
//! - fresh hit: serve the cached records without I/O
//! - stale hit: serve the cached records and start a background refresh
//! - miss: fetch from the origin, reconcile, cache, then answer
//!
//! At most one background refresh runs per key. Refresh failures keep the
//! stale entry in place so the next lookup retries.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashSet;
use schemars::JsonSchema;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::entry::{CacheEntry, Freshness};
use super::frequency::FrequencyClassifier;
use super::key::{CacheKey, Direction};
use super::negative::NegativeCache;
use super::policy::CachePolicy;
use super::store::{CacheStore, MemoryCacheStore};
use super::sync::OriginSyncWriter;
use crate::Error;
use crate::clock::{Clock, SystemClock};
use crate::flight::FlightRecord;
use crate::origin::OriginFetcher;
use crate::store::FlightStore;

/// How a lookup was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    NegativeHit,
    FreshHit,
    /// `refresh_scheduled` is false when a refresh for the key was already running.
    StaleHit { refresh_scheduled: bool },
    Miss,
}

#[derive(Debug, Clone)]
pub struct Lookup {
    pub records: Vec<FlightRecord>,
    pub outcome: LookupOutcome,
}

/// Call activity for one key in the current counting window.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct KeyActivity {
    pub key: String,
    pub calls: u32,
    pub hot: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheStats {
    pub hot_threshold: u32,
    pub keys: Vec<KeyActivity>,
    pub negative_markers: usize,
    pub refreshes_in_flight: usize,
}

/// Holds a key in the in-flight set until dropped.
struct RefreshGuard {
    in_flight: Arc<DashSet<CacheKey>>,
    key: CacheKey,
}

impl RefreshGuard {
    fn acquire(in_flight: &Arc<DashSet<CacheKey>>, key: &CacheKey) -> Option<Self> {
        in_flight
            .insert(key.clone())
            .then(|| Self { in_flight: Arc::clone(in_flight), key: key.clone() })
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

struct Inner {
    origin: Arc<dyn OriginFetcher>,
    writer: OriginSyncWriter,
    entries: Arc<dyn CacheStore>,
    frequency: FrequencyClassifier,
    negative: NegativeCache,
    in_flight: Arc<DashSet<CacheKey>>,
    /// Bumped by every eviction. A sync that started under an older epoch
    /// does not write cache state.
    epoch: AtomicU64,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl Inner {
    /// Fetch, reconcile and cache. State is only touched after the fetch and
    /// the existence lookup have succeeded.
    async fn sync_from_origin(
        &self, key: &CacheKey, fetch_timeout: Option<std::time::Duration>,
    ) -> Result<Vec<FlightRecord>, Error> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let started = Instant::now();
        let fetch = self.origin.fetch_schedules(key);
        let fresh = match fetch_timeout {
            Some(limit) => timeout(limit, fetch)
                .await
                .map_err(|_| Error::FetchTimeout(format!("{key} did not answer within {}ms", limit.as_millis())))??,
            None => fetch.await?,
        };
        debug!(key = %key, count = fresh.len(), elapsed_ms = started.elapsed().as_millis() as u64, "origin fetch completed");

        if fresh.is_empty() {
            if self.evicted_since(epoch, key) {
                return Ok(Vec::new());
            }
            self.negative.mark(key);
            if let Err(err) = self.entries.delete(key).await {
                warn!(key = %key, error = %err, "failed to drop cache entry for empty key");
            }
            debug!(key = %key, "origin returned no flights; key marked negative");
            return Ok(Vec::new());
        }

        let outcome = self.writer.reconcile(key, fresh).await?;
        if self.evicted_since(epoch, key) {
            return Ok(outcome.records);
        }
        self.negative.clear(key);
        if outcome.records.is_empty() {
            warn!(key = %key, "no records survived reconciliation; cache left unchanged");
            return Ok(outcome.records);
        }

        let ttl = self.frequency.ttl_for(key);
        let entry = CacheEntry::new(outcome.records.clone(), self.clock.now(), ttl, self.policy.physical_ttl);
        if let Err(err) = self.entries.put(key, entry).await {
            warn!(key = %key, error = %err, "failed to write cache entry");
        }
        Ok(outcome.records)
    }

    fn evicted_since(&self, epoch: u64, key: &CacheKey) -> bool {
        let evicted = self.epoch.load(Ordering::SeqCst) != epoch;
        if evicted {
            debug!(key = %key, "evicted while syncing; result not cached");
        }
        evicted
    }
}

/// Shared handle to the cache. Clones share all state.
#[derive(Clone)]
pub struct FlightCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for FlightCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlightCache")
            .field("policy", &self.inner.policy)
            .field("refreshes_in_flight", &self.inner.in_flight.len())
            .finish_non_exhaustive()
    }
}

pub struct FlightCacheBuilder {
    origin: Arc<dyn OriginFetcher>,
    store: Arc<dyn FlightStore>,
    entries: Option<Arc<dyn CacheStore>>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl FlightCacheBuilder {
    /// Cache store to use. Defaults to an in-memory store on the same clock.
    pub fn entries(mut self, entries: Arc<dyn CacheStore>) -> Self {
        self.entries = Some(entries);
        self
    }

    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> FlightCache {
        let entries = self.entries.unwrap_or_else(|| {
            Arc::new(MemoryCacheStore::with_clock(Arc::clone(&self.clock))) as Arc<dyn CacheStore>
        });
        let inner = Inner {
            origin: self.origin,
            writer: OriginSyncWriter::new(self.store),
            entries,
            frequency: FrequencyClassifier::new(&self.policy, Arc::clone(&self.clock)),
            negative: NegativeCache::new(self.policy.negative_ttl, Arc::clone(&self.clock)),
            in_flight: Arc::new(DashSet::new()),
            epoch: AtomicU64::new(0),
            policy: self.policy,
            clock: self.clock,
        };
        FlightCache { inner: Arc::new(inner) }
    }
}

impl FlightCache {
    pub fn builder(origin: Arc<dyn OriginFetcher>, store: Arc<dyn FlightStore>) -> FlightCacheBuilder {
        FlightCacheBuilder {
            origin,
            store,
            entries: None,
            policy: CachePolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Schedules for a location and direction.
    pub async fn get_schedules(&self, location_code: &str, direction: Direction) -> Result<Vec<FlightRecord>, Error> {
        let key = CacheKey::new(location_code, direction)?;
        Ok(self.lookup(&key).await?.records)
    }

    /// Answer a lookup, reporting which path served it.
    pub async fn lookup(&self, key: &CacheKey) -> Result<Lookup, Error> {
        let inner = &self.inner;
        inner.frequency.record_call(key);

        if inner.negative.is_negative(key) {
            debug!(key = %key, "negative hit");
            return Ok(Lookup { records: Vec::new(), outcome: LookupOutcome::NegativeHit });
        }

        let entry = match inner.entries.get(key).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key = %key, error = %err, "cache read failed; treating as miss");
                None
            }
        };

        if let Some(entry) = entry {
            match entry.freshness(inner.clock.now()) {
                Freshness::Fresh => {
                    debug!(key = %key, count = entry.records().len(), "fresh hit");
                    return Ok(Lookup { records: entry.into_records(), outcome: LookupOutcome::FreshHit });
                }
                Freshness::Stale => {
                    let refresh_scheduled = self.schedule_refresh(key);
                    debug!(key = %key, refresh_scheduled, "stale hit");
                    return Ok(Lookup {
                        records: entry.into_records(),
                        outcome: LookupOutcome::StaleHit { refresh_scheduled },
                    });
                }
                Freshness::Expired => {}
            }
        }

        debug!(key = %key, "miss");
        let records = inner.sync_from_origin(key, Some(inner.policy.fetch_timeout)).await?;
        Ok(Lookup { records, outcome: LookupOutcome::Miss })
    }

    /// Fetch from the origin now, ignoring both the negative marker and any
    /// cached entry. The result is reconciled and cached as on a miss.
    pub async fn refresh(&self, key: &CacheKey) -> Result<Vec<FlightRecord>, Error> {
        self.inner.frequency.record_call(key);
        let records = self.inner.sync_from_origin(key, Some(self.inner.policy.fetch_timeout)).await?;
        info!(key = %key, count = records.len(), "forced refresh completed");
        Ok(records)
    }

    /// Forget both directions of a location. Returns the cache entries removed.
    pub async fn evict(&self, location_code: &str) -> Result<u64, Error> {
        let prefix = CacheKey::location_prefix(location_code)?;
        let removed = self.clear(&prefix).await?;
        info!(prefix = %prefix, removed, "evicted location");
        Ok(removed)
    }

    /// Forget every key.
    pub async fn evict_all(&self) -> Result<u64, Error> {
        let removed = self.clear("").await?;
        info!(removed, "evicted all keys");
        Ok(removed)
    }

    async fn clear(&self, prefix: &str) -> Result<u64, Error> {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        let removed = self.inner.entries.delete_all(prefix).await?;
        self.inner.negative.clear_prefix(prefix);
        self.inner.frequency.reset(prefix);
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        let threshold = self.inner.frequency.hot_threshold();
        let keys = self
            .inner
            .frequency
            .snapshot()
            .into_iter()
            .map(|(key, calls)| KeyActivity { key: key.to_string(), calls, hot: calls >= threshold })
            .collect();
        CacheStats {
            hot_threshold: threshold,
            keys,
            negative_markers: self.inner.negative.len(),
            refreshes_in_flight: self.inner.in_flight.len(),
        }
    }

    /// Drop elapsed counters, expired negative markers and physically expired
    /// entries. Returns how many items were dropped.
    pub async fn sweep(&self) -> usize {
        let counters = self.inner.frequency.purge_elapsed();
        let markers = self.inner.negative.purge_expired();
        let entries = match self.inner.entries.purge_expired().await {
            Ok(n) => n as usize,
            Err(err) => {
                warn!(error = %err, "failed to purge expired cache entries");
                0
            }
        };
        debug!(counters, markers, entries, "sweep completed");
        counters + markers + entries
    }

    pub fn is_refreshing(&self, key: &CacheKey) -> bool {
        self.inner.in_flight.contains(key)
    }

    /// Start a background refresh unless one is already running for `key`.
    fn schedule_refresh(&self, key: &CacheKey) -> bool {
        let Some(guard) = RefreshGuard::acquire(&self.inner.in_flight, key) else {
            return false;
        };

        let inner = Arc::clone(&self.inner);
        let key = key.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let limit = inner.policy.refresh_timeout;
            match timeout(limit, inner.sync_from_origin(&key, None)).await {
                Ok(Ok(records)) => info!(key = %key, count = records.len(), "background refresh completed"),
                Ok(Err(err)) => warn!(key = %key, error = %err, "background refresh failed; keeping stale entry"),
                Err(_) => warn!(key = %key, timeout_ms = limit.as_millis() as u64, "background refresh timed out"),
            }
        });
        true
    }
}
