//! Cached record sets with logical and physical expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::flight::FlightRecord;

/// How an entry may be used at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Before logical expiry: serve without I/O.
    Fresh,
    /// Past logical expiry, before physical expiry: serve and refresh.
    Stale,
    /// Past physical expiry: must not be served.
    Expired,
}

/// The last-known record set for one key.
///
/// Always satisfies `fetched_at <= logical_expire_at <= physical_expire_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    records: Vec<FlightRecord>,
    fetched_at: DateTime<Utc>,
    logical_expire_at: DateTime<Utc>,
    physical_expire_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build an entry fetched at `fetched_at`.
    ///
    /// Negative TTLs are treated as zero and the physical TTL is raised to the
    /// logical one if it is shorter.
    pub fn new(
        records: Vec<FlightRecord>, fetched_at: DateTime<Utc>, logical_ttl: Duration, physical_ttl: Duration,
    ) -> Self {
        let logical_ttl = logical_ttl.max(Duration::zero());
        let physical_ttl = physical_ttl.max(logical_ttl);
        Self {
            records,
            fetched_at,
            logical_expire_at: fetched_at + logical_ttl,
            physical_expire_at: fetched_at + physical_ttl,
        }
    }

    /// Rebuild an entry from stored instants, restoring the ordering invariant.
    pub fn from_parts(
        records: Vec<FlightRecord>, fetched_at: DateTime<Utc>, logical_expire_at: DateTime<Utc>,
        physical_expire_at: DateTime<Utc>,
    ) -> Self {
        let logical_expire_at = logical_expire_at.max(fetched_at);
        let physical_expire_at = physical_expire_at.max(logical_expire_at);
        Self { records, fetched_at, logical_expire_at, physical_expire_at }
    }

    pub fn freshness(&self, now: DateTime<Utc>) -> Freshness {
        if now < self.logical_expire_at {
            Freshness::Fresh
        } else if now < self.physical_expire_at {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    pub fn is_physically_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.physical_expire_at
    }

    pub fn records(&self) -> &[FlightRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FlightRecord> {
        self.records
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn logical_expire_at(&self) -> DateTime<Utc> {
        self.logical_expire_at
    }

    pub fn physical_expire_at(&self) -> DateTime<Utc> {
        self.physical_expire_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(now: DateTime<Utc>) -> CacheEntry {
        CacheEntry::new(
            vec![FlightRecord::new("VN220", "2025-01-10 08:30")],
            now,
            Duration::minutes(5),
            Duration::minutes(60),
        )
    }

    #[test]
    fn test_freshness_transitions() {
        let t0 = Utc::now();
        let entry = entry_at(t0);

        assert_eq!(entry.freshness(t0), Freshness::Fresh);
        assert_eq!(entry.freshness(t0 + Duration::minutes(4)), Freshness::Fresh);
        assert_eq!(entry.freshness(t0 + Duration::minutes(5)), Freshness::Stale);
        assert_eq!(entry.freshness(t0 + Duration::minutes(59)), Freshness::Stale);
        assert_eq!(entry.freshness(t0 + Duration::minutes(60)), Freshness::Expired);
        assert!(entry.is_physically_expired(t0 + Duration::minutes(61)));
    }

    #[test]
    fn test_physical_never_before_logical() {
        let t0 = Utc::now();
        let entry = CacheEntry::new(Vec::new(), t0, Duration::minutes(30), Duration::minutes(10));
        assert_eq!(entry.logical_expire_at(), t0 + Duration::minutes(30));
        assert_eq!(entry.physical_expire_at(), t0 + Duration::minutes(30));
    }

    #[test]
    fn test_negative_ttl_clamped() {
        let t0 = Utc::now();
        let entry = CacheEntry::new(Vec::new(), t0, Duration::minutes(-1), Duration::minutes(-5));
        assert_eq!(entry.fetched_at(), t0);
        assert_eq!(entry.logical_expire_at(), t0);
        assert_eq!(entry.physical_expire_at(), t0);
        assert_eq!(entry.freshness(t0), Freshness::Expired);
    }

    #[test]
    fn test_from_parts_restores_order() {
        let t0 = Utc::now();
        let entry = CacheEntry::from_parts(Vec::new(), t0, t0 - Duration::minutes(1), t0 - Duration::minutes(2));
        assert!(entry.fetched_at() <= entry.logical_expire_at());
        assert!(entry.logical_expire_at() <= entry.physical_expire_at());
    }

    #[test]
    fn test_serde_roundtrip_keeps_instants() {
        let entry = entry_at(Utc::now());
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
