//! Schedule provider seam.

use async_trait::async_trait;

use crate::Error;
use crate::cache::CacheKey;
use crate::flight::FlightRecord;

/// Idempotent read of the current schedule for one key.
///
/// An empty `Vec` means the provider has no flights for the key; failures are
/// reported as `OriginUnavailable`, `OriginMalformed` or `FetchTimeout`.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    async fn fetch_schedules(&self, key: &CacheKey) -> Result<Vec<FlightRecord>, Error>;
}
