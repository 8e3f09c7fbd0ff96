//! Reconciliation of freshly fetched records against the backing store.
//!
//! Each fresh record is classified by identity and fingerprint:
//!
//! - no stored row: insert
//! - stored row with the same fingerprint: unchanged, the stored row is reused
//! - stored row with a different fingerprint: update under the stored id
//!
//! Inserts and updates go out as one batch each; unchanged records cause no
//! writes at all.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use super::key::CacheKey;
use crate::Error;
use crate::flight::{FlightIdentity, FlightRecord};
use crate::store::{BatchWrite, FlightStore};

/// Counts from one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Repeated identities within the fresh batch; the first occurrence wins.
    pub skipped: usize,
    /// Records the store refused individually.
    pub rejected: usize,
    /// Records lost because their whole batch failed.
    pub failed: usize,
}

impl SyncReport {
    pub fn writes(&self) -> usize {
        self.inserted + self.updated
    }
}

#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Surviving records in fresh-batch order.
    pub records: Vec<FlightRecord>,
    pub report: SyncReport,
}

enum Slot {
    Ready(FlightRecord),
    Pending(FlightIdentity),
}

#[derive(Clone)]
pub struct OriginSyncWriter {
    store: Arc<dyn FlightStore>,
}

impl OriginSyncWriter {
    pub fn new(store: Arc<dyn FlightStore>) -> Self {
        Self { store }
    }

    /// Persist `fresh` with minimal writes and return the records to cache.
    ///
    /// Fails only if the existence lookup fails. Batch write failures drop the
    /// affected records from the result and are logged.
    pub async fn reconcile(&self, key: &CacheKey, fresh: Vec<FlightRecord>) -> Result<SyncOutcome, Error> {
        let mut report = SyncReport::default();
        if fresh.is_empty() {
            return Ok(SyncOutcome { records: Vec::new(), report });
        }

        let mut identities = HashSet::with_capacity(fresh.len());
        let mut batch = Vec::with_capacity(fresh.len());
        for record in fresh {
            if identities.insert(record.identity()) {
                batch.push(record);
            } else {
                report.skipped += 1;
            }
        }

        let existing: HashMap<FlightIdentity, FlightRecord> = self
            .store
            .find_by_identities(&identities)
            .await?
            .into_iter()
            .map(|record| (record.identity(), record))
            .collect();

        let mut slots = Vec::with_capacity(batch.len());
        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        for mut record in batch {
            let identity = record.identity();
            match existing.get(&identity) {
                None => {
                    inserts.push(record);
                    slots.push(Slot::Pending(identity));
                }
                Some(stored) if stored.fingerprint() == record.fingerprint() => {
                    report.unchanged += 1;
                    slots.push(Slot::Ready(stored.clone()));
                }
                Some(stored) => {
                    record.id = stored.id;
                    updates.push(record);
                    slots.push(Slot::Pending(identity));
                }
            }
        }

        let mut written = HashMap::new();
        if !inserts.is_empty() {
            let count = inserts.len();
            let result = self.store.batch_insert(inserts).await;
            let inserted = self.absorb(key, "insert", count, result, &mut written, &mut report);
            report.inserted = inserted;
        }
        if !updates.is_empty() {
            let count = updates.len();
            let result = self.store.batch_update(updates).await;
            let updated = self.absorb(key, "update", count, result, &mut written, &mut report);
            report.updated = updated;
        }

        let records = slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Ready(record) => Some(record),
                Slot::Pending(identity) => written.remove(&identity),
            })
            .collect();

        debug!(
            key = %key,
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            rejected = report.rejected,
            failed = report.failed,
            "reconciled origin records"
        );

        Ok(SyncOutcome { records, report })
    }

    /// Fold one batch result into `written`, returning how many were written.
    fn absorb(
        &self, key: &CacheKey, op: &str, attempted: usize, result: Result<BatchWrite, Error>,
        written: &mut HashMap<FlightIdentity, FlightRecord>, report: &mut SyncReport,
    ) -> usize {
        match result {
            Ok(batch) => {
                for rejected in &batch.rejected {
                    warn!(key = %key, op, flight = %rejected.identity, error = %rejected.error, "record skipped");
                }
                report.rejected += batch.rejected.len();
                let count = batch.written.len();
                written.extend(batch.written.into_iter().map(|record| (record.identity(), record)));
                count
            }
            Err(err) => {
                warn!(key = %key, op, records = attempted, error = %err, "batch write failed");
                report.failed += attempted;
                0
            }
        }
    }
}
