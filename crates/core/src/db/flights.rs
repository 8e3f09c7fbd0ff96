//! Flight rows: the backing store behind the origin sync writer.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio_rusqlite::rusqlite::{self, ErrorCode, Row, ToSql};

use super::{FlightDb, format_instant};
use crate::Error;
use crate::flight::{FlightIdentity, FlightRecord};
use crate::store::{BatchWrite, FlightStore, RejectedRecord};

/// Identities per lookup query; two bound parameters each.
const IDENTITY_CHUNK: usize = 200;

macro_rules! flight_columns {
    () => {
        "airline_iata, airline_icao, flight_iata, flight_icao, flight_number, \
         dep_iata, dep_icao, dep_terminal, dep_gate, dep_time, dep_time_utc, dep_time_ts, \
         arr_iata, arr_icao, arr_terminal, arr_gate, arr_baggage, arr_time, arr_time_utc, arr_time_ts, \
         cs_airline_iata, cs_flight_number, cs_flight_iata, \
         status, duration, delayed, dep_delayed, arr_delayed, aircraft_icao"
    };
}

const INSERT_FLIGHT: &str = concat!(
    "INSERT INTO flights (",
    flight_columns!(),
    ", updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
);

const UPDATE_FLIGHT: &str = "UPDATE flights SET
    airline_iata = ?, airline_icao = ?, flight_iata = ?, flight_icao = ?, flight_number = ?,
    dep_iata = ?, dep_icao = ?, dep_terminal = ?, dep_gate = ?, dep_time = ?, dep_time_utc = ?, dep_time_ts = ?,
    arr_iata = ?, arr_icao = ?, arr_terminal = ?, arr_gate = ?, arr_baggage = ?, arr_time = ?, arr_time_utc = ?,
    arr_time_ts = ?, cs_airline_iata = ?, cs_flight_number = ?, cs_flight_iata = ?,
    status = ?, duration = ?, delayed = ?, dep_delayed = ?, arr_delayed = ?, aircraft_icao = ?,
    updated_at = ?
WHERE id = ?";

/// Business fields in column order, followed by `updated_at`.
fn bind<'a>(r: &'a FlightRecord, updated_at: &'a String) -> Vec<&'a dyn ToSql> {
    let values: [&'a dyn ToSql; 30] = [
        &r.airline_iata,
        &r.airline_icao,
        &r.flight_iata,
        &r.flight_icao,
        &r.flight_number,
        &r.dep_iata,
        &r.dep_icao,
        &r.dep_terminal,
        &r.dep_gate,
        &r.dep_time,
        &r.dep_time_utc,
        &r.dep_time_ts,
        &r.arr_iata,
        &r.arr_icao,
        &r.arr_terminal,
        &r.arr_gate,
        &r.arr_baggage,
        &r.arr_time,
        &r.arr_time_utc,
        &r.arr_time_ts,
        &r.cs_airline_iata,
        &r.cs_flight_number,
        &r.cs_flight_iata,
        &r.status,
        &r.duration,
        &r.delayed,
        &r.dep_delayed,
        &r.arr_delayed,
        &r.aircraft_icao,
        updated_at,
    ];
    Vec::from(values)
}

fn read_flight(row: &Row<'_>) -> rusqlite::Result<FlightRecord> {
    Ok(FlightRecord {
        id: row.get(0)?,
        airline_iata: row.get(1)?,
        airline_icao: row.get(2)?,
        flight_iata: row.get(3)?,
        flight_icao: row.get(4)?,
        flight_number: row.get(5)?,
        dep_iata: row.get(6)?,
        dep_icao: row.get(7)?,
        dep_terminal: row.get(8)?,
        dep_gate: row.get(9)?,
        dep_time: row.get(10)?,
        dep_time_utc: row.get(11)?,
        dep_time_ts: row.get(12)?,
        arr_iata: row.get(13)?,
        arr_icao: row.get(14)?,
        arr_terminal: row.get(15)?,
        arr_gate: row.get(16)?,
        arr_baggage: row.get(17)?,
        arr_time: row.get(18)?,
        arr_time_utc: row.get(19)?,
        arr_time_ts: row.get(20)?,
        cs_airline_iata: row.get(21)?,
        cs_flight_number: row.get(22)?,
        cs_flight_iata: row.get(23)?,
        status: row.get(24)?,
        duration: row.get(25)?,
        delayed: row.get(26)?,
        dep_delayed: row.get(27)?,
        arr_delayed: row.get(28)?,
        aircraft_icao: row.get(29)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

impl FlightDb {
    /// Number of stored flights.
    pub async fn count_flights(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl FlightStore for FlightDb {
    async fn find_by_identities(&self, identities: &HashSet<FlightIdentity>) -> Result<Vec<FlightRecord>, Error> {
        if identities.is_empty() {
            return Ok(Vec::new());
        }
        let identities: Vec<FlightIdentity> = identities.iter().cloned().collect();
        self.conn
            .call(move |conn| -> Result<Vec<FlightRecord>, Error> {
                let mut found = Vec::new();
                for chunk in identities.chunks(IDENTITY_CHUNK) {
                    let filter = vec!["(flight_iata = ? AND dep_time = ?)"; chunk.len()].join(" OR ");
                    let sql = format!(concat!("SELECT id, ", flight_columns!(), " FROM flights WHERE {}"), filter);
                    let params: Vec<&dyn ToSql> = chunk
                        .iter()
                        .flat_map(|identity| [&identity.flight_iata as &dyn ToSql, &identity.dep_time as &dyn ToSql])
                        .collect();

                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(params.as_slice(), read_flight)?;
                    for row in rows {
                        found.push(row?);
                    }
                }
                Ok(found)
            })
            .await
            .map_err(Error::from)
    }

    async fn batch_insert(&self, records: Vec<FlightRecord>) -> Result<BatchWrite, Error> {
        if records.is_empty() {
            return Ok(BatchWrite::default());
        }
        let updated_at = format_instant(self.clock.now());
        self.conn
            .call(move |conn| -> Result<BatchWrite, Error> {
                let tx = conn.transaction()?;
                let mut batch = BatchWrite::default();
                {
                    let mut stmt = tx.prepare_cached(INSERT_FLIGHT)?;
                    for record in records {
                        let result = stmt.execute(bind(&record, &updated_at).as_slice());
                        match result {
                            Ok(_) => {
                                let id = tx.last_insert_rowid();
                                batch.written.push(record.with_id(id));
                            }
                            Err(e) if is_constraint_violation(&e) => {
                                let identity = record.identity();
                                batch.rejected.push(RejectedRecord {
                                    error: Error::DuplicateRecordConflict(identity.to_string()),
                                    identity,
                                });
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                }
                tx.commit()?;
                Ok(batch)
            })
            .await
            .map_err(Error::from)
    }

    async fn batch_update(&self, records: Vec<FlightRecord>) -> Result<BatchWrite, Error> {
        if records.is_empty() {
            return Ok(BatchWrite::default());
        }
        let updated_at = format_instant(self.clock.now());
        self.conn
            .call(move |conn| -> Result<BatchWrite, Error> {
                let tx = conn.transaction()?;
                let mut batch = BatchWrite::default();
                {
                    let mut stmt = tx.prepare_cached(UPDATE_FLIGHT)?;
                    for record in records {
                        let identity = record.identity();
                        let Some(id) = record.id else {
                            batch.rejected.push(RejectedRecord {
                                error: Error::StoreFailure(format!("{identity} has no storage id")),
                                identity,
                            });
                            continue;
                        };

                        let mut params = bind(&record, &updated_at);
                        params.push(&id);
                        match stmt.execute(params.as_slice()) {
                            Ok(0) => batch.rejected.push(RejectedRecord {
                                error: Error::StoreFailure(format!("no flight row with id {id}")),
                                identity,
                            }),
                            Ok(_) => batch.written.push(record),
                            Err(e) if is_constraint_violation(&e) => batch.rejected.push(RejectedRecord {
                                error: Error::DuplicateRecordConflict(identity.to_string()),
                                identity,
                            }),
                            Err(e) => return Err(e.into()),
                        }
                    }
                }
                tx.commit()?;
                Ok(batch)
            })
            .await
            .map_err(Error::from)
    }
}
