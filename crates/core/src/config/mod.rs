//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FLIGHTCACHE_*)
//! 2. TOML config file (if FLIGHTCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CachePolicy;

mod validation;

pub use validation::ConfigError;

/// Where cache entries live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process memory; lost on restart.
    #[default]
    Memory,
    /// The `cache_entries` table of the SQLite database.
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FLIGHTCACHE_*)
/// 2. TOML config file (if FLIGHTCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// AirLabs API key for schedule lookups.
    ///
    /// Set via FLIGHTCACHE_AIRLABS_API_KEY environment variable.
    /// Required only when the origin is actually called.
    #[serde(default)]
    pub airlabs_api_key: Option<String>,

    /// AirLabs API base URL.
    #[serde(default = "default_airlabs_base_url")]
    pub airlabs_base_url: String,

    /// Path to SQLite database.
    ///
    /// Set via FLIGHTCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Origin fetch timeout on a cache miss, in milliseconds.
    ///
    /// Set via FLIGHTCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on a background refresh, in milliseconds.
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,

    /// Cache entry storage.
    ///
    /// Set via FLIGHTCACHE_CACHE_BACKEND (`memory` or `sqlite`).
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Calls within the counter window at which a key is hot.
    #[serde(default = "default_hot_threshold")]
    pub hot_threshold: u32,

    #[serde(default = "default_counter_window_secs")]
    pub counter_window_secs: u64,

    #[serde(default = "default_hot_ttl_secs")]
    pub hot_ttl_secs: u64,

    #[serde(default = "default_cold_ttl_secs")]
    pub cold_ttl_secs: u64,

    #[serde(default = "default_physical_ttl_secs")]
    pub physical_ttl_secs: u64,

    #[serde(default = "default_negative_ttl_secs")]
    pub negative_ttl_secs: u64,

    /// Interval between housekeeping sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_airlabs_base_url() -> String {
    "https://airlabs.co/api/v9".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./flightcache.sqlite")
}

fn default_user_agent() -> String {
    "flightcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_refresh_timeout_ms() -> u64 {
    30_000
}

fn default_hot_threshold() -> u32 {
    2
}

fn default_counter_window_secs() -> u64 {
    1800
}

fn default_hot_ttl_secs() -> u64 {
    1800
}

fn default_cold_ttl_secs() -> u64 {
    300
}

fn default_physical_ttl_secs() -> u64 {
    3600
}

fn default_negative_ttl_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            airlabs_api_key: None,
            airlabs_base_url: default_airlabs_base_url(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
            cache_backend: CacheBackend::default(),
            hot_threshold: default_hot_threshold(),
            counter_window_secs: default_counter_window_secs(),
            hot_ttl_secs: default_hot_ttl_secs(),
            cold_ttl_secs: default_cold_ttl_secs(),
            physical_ttl_secs: default_physical_ttl_secs(),
            negative_ttl_secs: default_negative_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn secs(value: u64) -> chrono::Duration {
    i64::try_from(value)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Cache tunables derived from this configuration.
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            counter_window: secs(self.counter_window_secs),
            hot_threshold: self.hot_threshold,
            hot_ttl: secs(self.hot_ttl_secs),
            cold_ttl: secs(self.cold_ttl_secs),
            physical_ttl: secs(self.physical_ttl_secs),
            negative_ttl: secs(self.negative_ttl_secs),
            fetch_timeout: self.timeout(),
            refresh_timeout: Duration::from_millis(self.refresh_timeout_ms),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FLIGHTCACHE_`
    /// 2. TOML file from `FLIGHTCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FLIGHTCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FLIGHTCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the AirLabs API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set or blank.
    pub fn require_airlabs_api_key(&self) -> Result<&str, ConfigError> {
        self.airlabs_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "airlabs_api_key".into(),
                hint: "Set FLIGHTCACHE_AIRLABS_API_KEY environment variable".into(),
            })
    }
}
