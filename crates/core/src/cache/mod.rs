//! Multi-layer flight schedule cache.
//!
//! Lookups are keyed by `(location code, direction)` and pass through:
//!
//! - a negative cache for keys that recently returned no flights
//! - a cache store with logical (stale) and physical (hard) expiry
//! - a frequency classifier choosing hot or cold logical TTLs
//! - an origin sync writer that persists fetched records with minimal writes

pub mod entry;
pub mod fingerprint;
pub mod frequency;
pub mod key;
pub mod negative;
pub mod orchestrator;
pub mod policy;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use entry::{CacheEntry, Freshness};
pub use frequency::FrequencyClassifier;
pub use key::{CacheKey, Direction};
pub use negative::NegativeCache;
pub use orchestrator::{CacheStats, FlightCache, FlightCacheBuilder, KeyActivity, Lookup, LookupOutcome};
pub use policy::CachePolicy;
pub use store::{CacheStore, MemoryCacheStore};
pub use sync::{OriginSyncWriter, SyncOutcome, SyncReport};
