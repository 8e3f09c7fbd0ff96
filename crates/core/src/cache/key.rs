//! Cache keys: a location code plus a schedule direction.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Which side of the schedule board a lookup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Arrivals,
    Departures,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Arrivals => "arrivals",
            Direction::Departures => "departures",
        }
    }

    /// Provider query parameter that filters schedules by this direction.
    pub fn query_param(self) -> &'static str {
        match self {
            Direction::Arrivals => "arr_iata",
            Direction::Departures => "dep_iata",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrivals" | "arrival" | "arr" => Ok(Direction::Arrivals),
            "departures" | "departure" | "dep" => Ok(Direction::Departures),
            other => Err(Error::InvalidInput(format!("unknown direction: {other}"))),
        }
    }
}

/// Normalized `(location code, direction)` pair.
///
/// The code is upper-cased on construction so differently-cased callers share
/// one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    code: String,
    direction: Direction,
}

impl CacheKey {
    pub fn new(location_code: &str, direction: Direction) -> Result<Self, Error> {
        let code = normalize_code(location_code)?;
        Ok(Self { code, direction })
    }

    /// Prefix shared by both directions of a location, e.g. `SGN:`.
    pub fn location_prefix(location_code: &str) -> Result<String, Error> {
        Ok(format!("{}:", normalize_code(location_code)?))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code, self.direction)
    }
}

fn normalize_code(location_code: &str) -> Result<String, Error> {
    let code = location_code.trim().to_ascii_uppercase();
    if !(3..=4).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidInput(format!(
            "location code must be 3-4 letters or digits, got {location_code:?}"
        )));
    }
    Ok(code)
}
