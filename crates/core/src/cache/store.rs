//! Cache store contract and the in-process implementation.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::entry::CacheEntry;
use super::key::CacheKey;
use crate::Error;
use crate::clock::{Clock, SystemClock};

/// Per-key storage of cache entries.
///
/// Implementations must replace entries whole: a concurrent `get` observes
/// either the previous entry or the new one. `get` never returns an entry
/// past its physical expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error>;

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), Error>;

    /// Returns whether an entry existed.
    async fn delete(&self, key: &CacheKey) -> Result<bool, Error>;

    /// Delete every entry whose key (in `CODE:direction` form) starts with
    /// `prefix`. An empty prefix clears the store.
    async fn delete_all(&self, prefix: &str) -> Result<u64, Error>;

    /// Drop physically expired entries.
    async fn purge_expired(&self) -> Result<u64, Error>;
}

/// Sharded in-memory cache store.
#[derive(Debug)]
pub struct MemoryCacheStore {
    entries: DashMap<CacheKey, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { entries: DashMap::new(), clock }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let now = self.clock.now();
        let entry = self.entries.get(key).map(|e| e.value().clone());
        match entry {
            Some(entry) if entry.is_physically_expired(now) => {
                self.entries.remove_if(key, |_, e| e.is_physically_expired(now));
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), Error> {
        self.entries.insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, Error> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn delete_all(&self, prefix: &str) -> Result<u64, Error> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.to_string().starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_physically_expired(now));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }
}
