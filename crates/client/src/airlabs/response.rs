//! AirLabs schedules response types and normalization.

use flightcache_core::FlightRecord;
use serde::Deserialize;

use crate::airlabs::AirLabsError;

/// Raw response envelope: `response` on success, `error` on failure.
#[derive(Debug, Deserialize)]
pub struct AirLabsEnvelope {
    #[serde(default)]
    pub response: Option<Vec<RawSchedule>>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One schedule item as sent by AirLabs. Every field may be absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSchedule {
    pub airline_iata: Option<String>,
    pub airline_icao: Option<String>,
    pub flight_iata: Option<String>,
    pub flight_icao: Option<String>,
    pub flight_number: Option<String>,
    pub dep_iata: Option<String>,
    pub dep_icao: Option<String>,
    pub dep_terminal: Option<String>,
    pub dep_gate: Option<String>,
    pub dep_time: Option<String>,
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

impl RawSchedule {
    /// Convert to a record, or `None` when the flight code or scheduled
    /// departure is missing.
    pub fn into_record(self) -> Option<FlightRecord> {
        let flight_iata = self.flight_iata.filter(|v| !v.trim().is_empty())?;
        let dep_time = self.dep_time.filter(|v| !v.trim().is_empty())?;
        Some(FlightRecord {
            id: None,
            airline_iata: self.airline_iata,
            airline_icao: self.airline_icao,
            flight_iata,
            flight_icao: self.flight_icao,
            flight_number: self.flight_number,
            dep_iata: self.dep_iata,
            dep_icao: self.dep_icao,
            dep_terminal: self.dep_terminal,
            dep_gate: self.dep_gate,
            dep_time,
            dep_time_utc: self.dep_time_utc,
            dep_time_ts: self.dep_time_ts,
            arr_iata: self.arr_iata,
            arr_icao: self.arr_icao,
            arr_terminal: self.arr_terminal,
            arr_gate: self.arr_gate,
            arr_baggage: self.arr_baggage,
            arr_time: self.arr_time,
            arr_time_utc: self.arr_time_utc,
            arr_time_ts: self.arr_time_ts,
            cs_airline_iata: self.cs_airline_iata,
            cs_flight_number: self.cs_flight_number,
            cs_flight_iata: self.cs_flight_iata,
            status: self.status,
            duration: self.duration,
            delayed: self.delayed,
            dep_delayed: self.dep_delayed,
            arr_delayed: self.arr_delayed,
            aircraft_icao: self.aircraft_icao,
        })
    }
}

/// Normalized schedules for one request.
#[derive(Debug, Clone, Default)]
pub struct ScheduleBatch {
    pub records: Vec<FlightRecord>,
    /// Items dropped for lacking an identity.
    pub dropped: usize,
}

impl TryFrom<AirLabsEnvelope> for ScheduleBatch {
    type Error = AirLabsError;

    fn try_from(raw: AirLabsEnvelope) -> Result<Self, Self::Error> {
        if let Some(error) = raw.error {
            return Err(AirLabsError::Api {
                code: error.code.unwrap_or_else(|| "unknown".into()),
                message: error.message.unwrap_or_default(),
            });
        }

        let items = raw
            .response
            .ok_or_else(|| AirLabsError::Parse("body has neither `response` nor `error`".into()))?;
        let total = items.len();
        let records: Vec<_> = items.into_iter().filter_map(RawSchedule::into_record).collect();
        Ok(Self { dropped: total - records.len(), records })
    }
}

/// Parse and normalize a response body.
pub fn parse_body(bytes: &[u8]) -> Result<ScheduleBatch, AirLabsError> {
    let envelope: AirLabsEnvelope = serde_json::from_slice(bytes).map_err(|e| AirLabsError::Parse(e.to_string()))?;
    ScheduleBatch::try_from(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "request": {"lang": "en", "currency": "USD"},
        "response": [
            {
                "airline_iata": "VN", "airline_icao": "HVN",
                "flight_iata": "VN220", "flight_icao": "HVN220", "flight_number": "220",
                "dep_iata": "SGN", "dep_icao": "VVTS", "dep_terminal": "1", "dep_gate": null,
                "dep_time": "2025-01-10 08:30", "dep_time_utc": "2025-01-10 01:30", "dep_time_ts": 1736472600,
                "arr_iata": "HAN", "arr_icao": "VVNB", "arr_terminal": "1",
                "arr_time": "2025-01-10 10:40", "arr_time_utc": "2025-01-10 03:40", "arr_time_ts": 1736480400,
                "cs_airline_iata": null, "cs_flight_number": null, "cs_flight_iata": null,
                "status": "scheduled", "duration": 130, "delayed": null, "aircraft_icao": "A321"
            },
            {
                "airline_iata": "VJ", "flight_iata": "VJ120", "dep_iata": "SGN",
                "dep_time": "2025-01-10 09:00", "arr_iata": "HAN", "status": "active", "dep_delayed": 12
            },
            {"airline_iata": "QH", "dep_iata": "SGN", "dep_time": "2025-01-10 09:15"},
            {"flight_iata": "BL6020", "dep_iata": "SGN", "dep_time": "  "}
        ]
    }"#;

    #[test]
    fn test_parse_sample_response() {
        let batch = parse_body(SAMPLE.as_bytes()).unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.dropped, 2);

        let first = &batch.records[0];
        assert_eq!(first.flight_iata, "VN220");
        assert_eq!(first.dep_time, "2025-01-10 08:30");
        assert_eq!(first.dep_time_ts, Some(1_736_472_600));
        assert_eq!(first.duration, Some(130));
        assert_eq!(first.aircraft_icao.as_deref(), Some("A321"));
        assert!(first.dep_gate.is_none());
        assert!(first.id.is_none());

        assert_eq!(batch.records[1].dep_delayed, Some(12));
    }

    #[test]
    fn test_empty_response_is_not_an_error() {
        let batch = parse_body(br#"{"response": []}"#).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.dropped, 0);
    }

    #[test]
    fn test_provider_error_body() {
        let body = br#"{"error": {"message": "Unknown API key", "code": "unknown_api_key"}}"#;
        let err = parse_body(body).unwrap_err();
        assert!(matches!(err, AirLabsError::Api { ref code, .. } if code == "unknown_api_key"));
    }

    #[test]
    fn test_missing_response_array_is_malformed() {
        assert!(matches!(parse_body(br#"{"request": {}}"#), Err(AirLabsError::Parse(_))));
        assert!(matches!(parse_body(b"<html>"), Err(AirLabsError::Parse(_))));
        assert!(matches!(parse_body(br#"{"response": {"flights": []}}"#), Err(AirLabsError::Parse(_))));
    }
}
