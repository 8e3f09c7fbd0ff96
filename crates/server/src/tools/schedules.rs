//! flight_schedules tool implementation.
//!
//! Answers a schedule lookup from the flight cache.

use flightcache_core::{CacheKey, Direction, Error, FlightCache, FlightRecord, LookupOutcome};
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for flight_schedules tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FlightSchedulesParams {
    /// IATA (3 letters) or ICAO (4 letters) airport code, e.g. "SGN".
    pub location_code: String,

    /// "arrivals" or "departures" (also accepts "arr" / "dep").
    pub direction: String,

    /// Skip the cache and the empty-location marker, fetching from the provider.
    #[serde(default)]
    pub force_refresh: bool,
}

/// How the request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    FreshHit,
    StaleHit,
    Miss,
    NegativeHit,
    Forced,
}

impl From<LookupOutcome> for CacheStatus {
    fn from(outcome: LookupOutcome) -> Self {
        match outcome {
            LookupOutcome::FreshHit => CacheStatus::FreshHit,
            LookupOutcome::StaleHit { .. } => CacheStatus::StaleHit,
            LookupOutcome::Miss => CacheStatus::Miss,
            LookupOutcome::NegativeHit => CacheStatus::NegativeHit,
        }
    }
}

/// Output structure for flight_schedules tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FlightSchedulesOutput {
    /// Normalized cache key, e.g. "SGN:departures".
    pub key: String,
    pub cache_status: CacheStatus,
    /// True when a stale answer triggered a background refresh.
    pub refresh_scheduled: bool,
    pub count: usize,
    pub flights: Vec<FlightRecord>,
}

/// Implementation of the flight_schedules tool.
pub async fn schedules_impl(cache: &FlightCache, params: FlightSchedulesParams) -> Result<CallToolResult, McpError> {
    let direction: Direction = params.direction.parse()?;
    let key = CacheKey::new(&params.location_code, direction)?;

    let (flights, cache_status, refresh_scheduled) = if params.force_refresh {
        (cache.refresh(&key).await?, CacheStatus::Forced, false)
    } else {
        let lookup = cache.lookup(&key).await?;
        let scheduled = matches!(lookup.outcome, LookupOutcome::StaleHit { refresh_scheduled: true });
        (lookup.records, CacheStatus::from(lookup.outcome), scheduled)
    };

    let output =
        FlightSchedulesOutput { key: key.to_string(), cache_status, refresh_scheduled, count: flights.len(), flights };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
