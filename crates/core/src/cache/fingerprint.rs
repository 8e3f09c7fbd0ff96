//! Content fingerprint of a flight record's business fields.

use sha2::{Digest, Sha256};

use crate::flight::FlightRecord;

/// Compute the fingerprint of a record.
///
/// Every business field is written in a fixed order with a presence tag and a
/// length prefix, so `None` and `Some("")` differ and no value can bleed into
/// its neighbour. The storage identifier is not part of the digest.
pub fn compute(record: &FlightRecord) -> String {
    let mut hasher = Sha256::new();

    text(&mut hasher, record.airline_iata.as_deref());
    text(&mut hasher, record.airline_icao.as_deref());
    text(&mut hasher, Some(&record.flight_iata));
    text(&mut hasher, record.flight_icao.as_deref());
    text(&mut hasher, record.flight_number.as_deref());

    text(&mut hasher, record.dep_iata.as_deref());
    text(&mut hasher, record.dep_icao.as_deref());
    text(&mut hasher, record.dep_terminal.as_deref());
    text(&mut hasher, record.dep_gate.as_deref());
    text(&mut hasher, Some(&record.dep_time));
    text(&mut hasher, record.dep_time_utc.as_deref());
    number(&mut hasher, record.dep_time_ts);

    text(&mut hasher, record.arr_iata.as_deref());
    text(&mut hasher, record.arr_icao.as_deref());
    text(&mut hasher, record.arr_terminal.as_deref());
    text(&mut hasher, record.arr_gate.as_deref());
    text(&mut hasher, record.arr_baggage.as_deref());
    text(&mut hasher, record.arr_time.as_deref());
    text(&mut hasher, record.arr_time_utc.as_deref());
    number(&mut hasher, record.arr_time_ts);

    text(&mut hasher, record.cs_airline_iata.as_deref());
    text(&mut hasher, record.cs_flight_number.as_deref());
    text(&mut hasher, record.cs_flight_iata.as_deref());

    text(&mut hasher, record.status.as_deref());
    number(&mut hasher, record.duration.map(i64::from));
    number(&mut hasher, record.delayed.map(i64::from));
    number(&mut hasher, record.dep_delayed.map(i64::from));
    number(&mut hasher, record.arr_delayed.map(i64::from));
    text(&mut hasher, record.aircraft_icao.as_deref());

    hex::encode(hasher.finalize())
}

fn text(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hasher.update((v.len() as u64).to_le_bytes());
            hasher.update(v.as_bytes());
        }
        None => hasher.update([0u8]),
    }
}

fn number(hasher: &mut Sha256, value: Option<i64>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hasher.update(v.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
}
