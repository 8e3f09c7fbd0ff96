//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 300_000;
const MAX_TTL_SECS: u64 = 7 * 24 * 3600;

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - a timeout is below 100ms or exceeds 5 minutes
    /// - `hot_threshold` is 0
    /// - a TTL or window is outside 1 second to 7 days
    /// - `physical_ttl_secs` is shorter than `hot_ttl_secs`
    /// - `cold_ttl_secs` is longer than `hot_ttl_secs`
    /// - `user_agent` is empty or the base URL is not http(s)
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("timeout_ms", self.timeout_ms), ("refresh_timeout_ms", self.refresh_timeout_ms)] {
            if value < MIN_TIMEOUT_MS {
                return Err(invalid(field, "must be at least 100ms"));
            }
            if value > MAX_TIMEOUT_MS {
                return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.hot_threshold == 0 {
            return Err(invalid("hot_threshold", "must be at least 1"));
        }

        for (field, value) in [
            ("counter_window_secs", self.counter_window_secs),
            ("hot_ttl_secs", self.hot_ttl_secs),
            ("cold_ttl_secs", self.cold_ttl_secs),
            ("physical_ttl_secs", self.physical_ttl_secs),
            ("negative_ttl_secs", self.negative_ttl_secs),
        ] {
            if value == 0 || value > MAX_TTL_SECS {
                return Err(invalid(field, "must be between 1 second and 7 days"));
            }
        }

        if self.physical_ttl_secs < self.hot_ttl_secs {
            return Err(invalid("physical_ttl_secs", "must not be shorter than hot_ttl_secs"));
        }
        if self.cold_ttl_secs > self.hot_ttl_secs {
            return Err(invalid("cold_ttl_secs", "must not be longer than hot_ttl_secs"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.airlabs_base_url.starts_with("http://") && !self.airlabs_base_url.starts_with("https://") {
            return Err(invalid("airlabs_base_url", "must start with http:// or https://"));
        }

        if self.sweep_interval_secs == 0 {
            return Err(invalid("sweep_interval_secs", "must be at least 1 second"));
        }

        if self.negative_ttl_secs > self.hot_ttl_secs {
            tracing::warn!(
                negative_ttl_secs = self.negative_ttl_secs,
                hot_ttl_secs = self.hot_ttl_secs,
                "negative_ttl_secs exceeds hot_ttl_secs; empty locations will be retried rarely"
            );
        }

        Ok(())
    }
}
