//! Persistent cache store backed by the `cache_entries` table.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

use super::{FlightDb, format_instant, parse_instant};
use crate::Error;
use crate::cache::{CacheEntry, CacheKey, CacheStore};
use crate::flight::FlightRecord;

#[async_trait]
impl CacheStore for FlightDb {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let cache_key = key.to_string();
        let now = self.clock.now();
        let now_text = format_instant(now);
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let row = conn
                    .query_row(
                        "SELECT records_json, fetched_at, logical_expire_at, physical_expire_at
                         FROM cache_entries WHERE cache_key = ?1",
                        params![cache_key],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, String>(3)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some((records_json, fetched_at, logical, physical)) = row else {
                    return Ok(None);
                };

                let physical = parse_instant(&physical)?;
                if now >= physical {
                    conn.execute(
                        "DELETE FROM cache_entries WHERE cache_key = ?1 AND physical_expire_at <= ?2",
                        params![cache_key, now_text],
                    )?;
                    return Ok(None);
                }

                let records: Vec<FlightRecord> = serde_json::from_str(&records_json)?;
                Ok(Some(CacheEntry::from_parts(
                    records,
                    parse_instant(&fetched_at)?,
                    parse_instant(&logical)?,
                    physical,
                )))
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), Error> {
        let cache_key = key.to_string();
        let records_json = serde_json::to_string(entry.records())?;
        let fetched_at = format_instant(entry.fetched_at());
        let logical = format_instant(entry.logical_expire_at());
        let physical = format_instant(entry.physical_expire_at());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (cache_key, records_json, fetched_at, logical_expire_at, physical_expire_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(cache_key) DO UPDATE SET
                        records_json = excluded.records_json,
                        fetched_at = excluded.fetched_at,
                        logical_expire_at = excluded.logical_expire_at,
                        physical_expire_at = excluded.physical_expire_at",
                    params![cache_key, records_json, fetched_at, logical, physical],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, Error> {
        let cache_key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let changes = conn.execute("DELETE FROM cache_entries WHERE cache_key = ?1", params![cache_key])?;
                Ok(changes > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_all(&self, prefix: &str) -> Result<u64, Error> {
        let prefix = prefix.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let changes = if prefix.is_empty() {
                    conn.execute("DELETE FROM cache_entries", [])?
                } else {
                    conn.execute(
                        "DELETE FROM cache_entries WHERE substr(cache_key, 1, length(?1)) = ?1",
                        params![prefix],
                    )?
                };
                Ok(changes as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let now = format_instant(self.clock.now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let changes = conn.execute("DELETE FROM cache_entries WHERE physical_expire_at <= ?1", params![now])?;
                Ok(changes as u64)
            })
            .await
            .map_err(Error::from)
    }
}

impl FlightDb {
    /// Number of rows in the persistent cache, expired or not.
    pub async fn count_cache_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
