//! Test doubles for the cache engine.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::store::CacheStore;
use crate::Error;
use crate::flight::{FlightIdentity, FlightRecord};
use crate::origin::OriginFetcher;
use crate::store::{BatchWrite, FlightStore, RejectedRecord};

pub(crate) fn make_test_flight(flight_iata: &str, status: &str) -> FlightRecord {
    let mut record = FlightRecord::new(flight_iata, "2025-01-10 08:30");
    record.airline_iata = Some(flight_iata[..2].to_string());
    record.dep_iata = Some("SGN".to_string());
    record.arr_iata = Some("HAN".to_string());
    record.status = Some(status.to_string());
    record.duration = Some(130);
    record
}

pub(crate) fn make_test_flights(count: usize) -> Vec<FlightRecord> {
    (0..count).map(|i| make_test_flight(&format!("VN{}", 200 + i), "scheduled")).collect()
}

/// Poll `condition` until it holds or a second has passed.
pub(crate) async fn wait_for(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum OriginFailure {
    Unavailable,
    Malformed,
}

/// Origin returning canned responses per key, with optional gating, delay,
/// and failure injection.
#[derive(Debug, Default)]
pub(crate) struct ScriptedOrigin {
    responses: Mutex<HashMap<CacheKey, Vec<FlightRecord>>>,
    failure: Mutex<Option<OriginFailure>>,
    gate: Mutex<Option<Arc<Notify>>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl ScriptedOrigin {
    pub(crate) fn respond(&self, key: &CacheKey, records: Vec<FlightRecord>) {
        self.responses.lock().unwrap().insert(key.clone(), records);
    }

    pub(crate) fn fail(&self, failure: Option<OriginFailure>) {
        *self.failure.lock().unwrap() = failure;
    }

    /// Block fetches until the returned handle is notified once per fetch.
    pub(crate) fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_one();
        }
    }

    pub(crate) fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OriginFetcher for ScriptedOrigin {
    async fn fetch_schedules(&self, key: &CacheKey) -> Result<Vec<FlightRecord>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match *self.failure.lock().unwrap() {
            Some(OriginFailure::Unavailable) => Err(Error::OriginUnavailable("connection refused".into())),
            Some(OriginFailure::Malformed) => Err(Error::OriginMalformed("missing response array".into())),
            None => Ok(self.responses.lock().unwrap().get(key).cloned().unwrap_or_default()),
        }
    }
}

/// In-memory flight store that records every call it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingStore {
    rows: Mutex<HashMap<FlightIdentity, FlightRecord>>,
    next_id: AtomicI64,
    find_calls: AtomicUsize,
    insert_calls: Mutex<Vec<usize>>,
    update_calls: Mutex<Vec<usize>>,
    conflicts: Mutex<HashSet<FlightIdentity>>,
    fail_find: AtomicBool,
    fail_insert: AtomicBool,
}

impl RecordingStore {
    /// Store `records` directly, returning them with assigned ids.
    pub(crate) fn seed(&self, records: Vec<FlightRecord>) -> Vec<FlightRecord> {
        let mut rows = self.rows.lock().unwrap();
        records
            .into_iter()
            .map(|record| {
                let record = record.with_id(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
                rows.insert(record.identity(), record.clone());
                record
            })
            .collect()
    }

    /// Make inserts of `identity` fail as if another writer got there first.
    pub(crate) fn conflict_on(&self, identity: FlightIdentity) {
        self.conflicts.lock().unwrap().insert(identity);
    }

    pub(crate) fn fail_find(&self, fail: bool) {
        self.fail_find.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Sizes of each insert batch received.
    pub(crate) fn insert_calls(&self) -> Vec<usize> {
        self.insert_calls.lock().unwrap().clone()
    }

    pub(crate) fn update_calls(&self) -> Vec<usize> {
        self.update_calls.lock().unwrap().clone()
    }

    pub(crate) fn row(&self, identity: &FlightIdentity) -> Option<FlightRecord> {
        self.rows.lock().unwrap().get(identity).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl FlightStore for RecordingStore {
    async fn find_by_identities(&self, identities: &HashSet<FlightIdentity>) -> Result<Vec<FlightRecord>, Error> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(Error::StoreFailure("disk I/O error".into()));
        }
        let rows = self.rows.lock().unwrap();
        Ok(identities.iter().filter_map(|identity| rows.get(identity).cloned()).collect())
    }

    async fn batch_insert(&self, records: Vec<FlightRecord>) -> Result<BatchWrite, Error> {
        self.insert_calls.lock().unwrap().push(records.len());
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(Error::StoreFailure("database is locked".into()));
        }

        let conflicts = self.conflicts.lock().unwrap().clone();
        let mut rows = self.rows.lock().unwrap();
        let mut batch = BatchWrite::default();
        for record in records {
            let identity = record.identity();
            if conflicts.contains(&identity) || rows.contains_key(&identity) {
                batch.rejected.push(RejectedRecord {
                    error: Error::DuplicateRecordConflict(identity.to_string()),
                    identity,
                });
                continue;
            }
            let record = record.with_id(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            rows.insert(identity, record.clone());
            batch.written.push(record);
        }
        Ok(batch)
    }

    async fn batch_update(&self, records: Vec<FlightRecord>) -> Result<BatchWrite, Error> {
        self.update_calls.lock().unwrap().push(records.len());

        let mut rows = self.rows.lock().unwrap();
        let mut batch = BatchWrite::default();
        for record in records {
            let identity = record.identity();
            match rows.get_mut(&identity) {
                Some(row) if row.id.is_some() && row.id == record.id => {
                    *row = record.clone();
                    batch.written.push(record);
                }
                _ => batch.rejected.push(RejectedRecord {
                    error: Error::StoreFailure(format!("no row to update for {identity}")),
                    identity,
                }),
            }
        }
        Ok(batch)
    }
}

/// Cache store whose every operation fails.
#[derive(Debug, Default)]
pub(crate) struct BrokenCacheStore;

#[async_trait]
impl CacheStore for BrokenCacheStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        Err(Error::StoreFailure("cache unavailable".into()))
    }

    async fn put(&self, _key: &CacheKey, _entry: CacheEntry) -> Result<(), Error> {
        Err(Error::StoreFailure("cache unavailable".into()))
    }

    async fn delete(&self, _key: &CacheKey) -> Result<bool, Error> {
        Err(Error::StoreFailure("cache unavailable".into()))
    }

    async fn delete_all(&self, _prefix: &str) -> Result<u64, Error> {
        Err(Error::StoreFailure("cache unavailable".into()))
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        Err(Error::StoreFailure("cache unavailable".into()))
    }
}
