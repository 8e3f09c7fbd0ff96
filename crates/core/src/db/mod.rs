//! SQLite persistence: the flight backing store and the persistent cache store.
//!
//! The database is opened in WAL mode and migrated on open. All access goes
//! through a tokio-rusqlite connection that runs statements on a background
//! thread.

pub mod entries;
pub mod flights;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::Connection;

use crate::Error;
use crate::clock::{Clock, SystemClock};

/// Fixed-width UTC timestamp so stored instants compare correctly as text.
pub(crate) fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_instant(value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| Error::StoreFailure(format!("bad timestamp {value:?}: {e}")))
}

/// Database handle.
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Clone, Debug)]
pub struct FlightDb {
    pub(crate) conn: Connection,
    clock: Arc<dyn Clock>,
}

impl FlightDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas, and runs any
    /// pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Replace the clock used for expiry decisions and row timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn, clock: Arc::new(SystemClock) })
    }
}
