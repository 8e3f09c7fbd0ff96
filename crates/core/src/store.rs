//! Backing store seam used by the origin sync writer.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::Error;
use crate::flight::{FlightIdentity, FlightRecord};

/// A record the store refused, with the reason.
#[derive(Debug)]
pub struct RejectedRecord {
    pub identity: FlightIdentity,
    pub error: Error,
}

/// Per-record outcome of a batch insert or update.
#[derive(Debug, Default)]
pub struct BatchWrite {
    /// Records as persisted, carrying their storage identifiers.
    pub written: Vec<FlightRecord>,
    pub rejected: Vec<RejectedRecord>,
}

/// Persistent flight storage keyed by [`FlightIdentity`].
#[async_trait]
pub trait FlightStore: Send + Sync {
    /// Stored records matching any of `identities`, in one batched read.
    async fn find_by_identities(&self, identities: &HashSet<FlightIdentity>) -> Result<Vec<FlightRecord>, Error>;

    /// Insert new records. A uniqueness collision rejects only that record.
    async fn batch_insert(&self, records: Vec<FlightRecord>) -> Result<BatchWrite, Error>;

    /// Overwrite records by storage id. A missing row or a collision rejects
    /// only that record.
    async fn batch_update(&self, records: Vec<FlightRecord>) -> Result<BatchWrite, Error>;
}
