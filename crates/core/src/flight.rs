//! Flight schedule record model.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cache::fingerprint;

/// A scheduled flight as returned by the schedule provider.
///
/// `flight_iata` and `dep_time` are required: together they form the record's
/// identity, which the backing store keeps unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FlightRecord {
    /// Storage-assigned identifier. `None` until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub airline_iata: Option<String>,
    pub airline_icao: Option<String>,
    pub flight_iata: String,
    pub flight_icao: Option<String>,
    pub flight_number: Option<String>,

    pub dep_iata: Option<String>,
    pub dep_icao: Option<String>,
    pub dep_terminal: Option<String>,
    pub dep_gate: Option<String>,
    pub dep_time: String,
    pub dep_time_utc: Option<String>,
    pub dep_time_ts: Option<i64>,

    pub arr_iata: Option<String>,
    pub arr_icao: Option<String>,
    pub arr_terminal: Option<String>,
    pub arr_gate: Option<String>,
    pub arr_baggage: Option<String>,
    pub arr_time: Option<String>,
    pub arr_time_utc: Option<String>,
    pub arr_time_ts: Option<i64>,

    pub cs_airline_iata: Option<String>,
    pub cs_flight_number: Option<String>,
    pub cs_flight_iata: Option<String>,

    pub status: Option<String>,
    pub duration: Option<i32>,
    pub delayed: Option<i32>,
    pub dep_delayed: Option<i32>,
    pub arr_delayed: Option<i32>,
    pub aircraft_icao: Option<String>,
}

/// Unique identity of a flight: flight code plus scheduled departure time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlightIdentity {
    pub flight_iata: String,
    pub dep_time: String,
}

impl fmt::Display for FlightIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.flight_iata, self.dep_time)
    }
}

impl FlightRecord {
    /// A record with only its identity fields set.
    pub fn new(flight_iata: impl Into<String>, dep_time: impl Into<String>) -> Self {
        Self {
            id: None,
            airline_iata: None,
            airline_icao: None,
            flight_iata: flight_iata.into(),
            flight_icao: None,
            flight_number: None,
            dep_iata: None,
            dep_icao: None,
            dep_terminal: None,
            dep_gate: None,
            dep_time: dep_time.into(),
            dep_time_utc: None,
            dep_time_ts: None,
            arr_iata: None,
            arr_icao: None,
            arr_terminal: None,
            arr_gate: None,
            arr_baggage: None,
            arr_time: None,
            arr_time_utc: None,
            arr_time_ts: None,
            cs_airline_iata: None,
            cs_flight_number: None,
            cs_flight_iata: None,
            status: None,
            duration: None,
            delayed: None,
            dep_delayed: None,
            arr_delayed: None,
            aircraft_icao: None,
        }
    }

    pub fn identity(&self) -> FlightIdentity {
        FlightIdentity { flight_iata: self.flight_iata.clone(), dep_time: self.dep_time.clone() }
    }

    /// Digest of every business field; `id` is excluded.
    pub fn fingerprint(&self) -> String {
        fingerprint::compute(self)
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let record = FlightRecord::new("VN220", "2025-01-10 08:30");
        let identity = record.identity();
        assert_eq!(identity.flight_iata, "VN220");
        assert_eq!(identity.dep_time, "2025-01-10 08:30");
        assert_eq!(identity.to_string(), "VN220@2025-01-10 08:30");
    }

    #[test]
    fn test_deserialize_provider_shape() {
        let json = r#"{
            "airline_iata": "VN",
            "flight_iata": "VN220",
            "dep_iata": "SGN",
            "dep_time": "2025-01-10 08:30",
            "arr_iata": "HAN",
            "status": "scheduled",
            "duration": 130,
            "dep_time_ts": 1736472600
        }"#;
        let record: FlightRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.airline_iata.as_deref(), Some("VN"));
        assert_eq!(record.duration, Some(130));
        assert_eq!(record.dep_time_ts, Some(1_736_472_600));
        assert!(record.arr_gate.is_none());
    }

    #[test]
    fn test_id_not_serialized_when_absent() {
        let record = FlightRecord::new("VN220", "2025-01-10 08:30");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("id").is_none());

        let json = serde_json::to_value(record.with_id(7)).unwrap();
        assert_eq!(json["id"], 7);
    }
}
