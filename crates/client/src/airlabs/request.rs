//! AirLabs schedules request parameters and validation.

use flightcache_core::{CacheKey, Direction};

use crate::airlabs::AirLabsError;

/// One schedules query: a location code filtered by direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    /// IATA (3) or ICAO (4) location code.
    pub code: String,
    pub direction: Direction,
}

impl ScheduleRequest {
    pub fn new(code: impl Into<String>, direction: Direction) -> Self {
        Self { code: code.into(), direction }
    }

    /// Validate the request parameters.
    pub fn validate(&self) -> Result<(), AirLabsError> {
        let len = self.code.len();
        if !(3..=4).contains(&len) || !self.code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AirLabsError::InvalidCode(format!(
                "{:?}: must be 3-4 letters or digits",
                self.code
            )));
        }
        Ok(())
    }

    /// Query filter as a `(name, value)` pair, e.g. `("dep_iata", "SGN")`.
    pub fn filter(&self) -> (&'static str, &str) {
        (self.direction.query_param(), &self.code)
    }
}

impl From<&CacheKey> for ScheduleRequest {
    fn from(key: &CacheKey) -> Self {
        Self::new(key.code(), key.direction())
    }
}
