//! cache_evict tool implementation.
//!
//! Drops cached schedules, empty-location markers and call counters for one
//! location, or for everything.

use flightcache_core::{CacheKey, Error, FlightCache};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_evict tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheEvictParams {
    /// Location to evict. Omit to evict everything.
    #[serde(default)]
    pub location_code: Option<String>,
}

/// Output from the cache_evict tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEvictOutput {
    /// Evicted location code, or "all".
    pub scope: String,
    /// Number of cache entries removed.
    pub evicted: u64,
}

/// Implementation of the cache_evict tool.
pub async fn evict_impl(cache: &FlightCache, params: CacheEvictParams) -> Result<CallToolResult, McpError> {
    let output = match params.location_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            let prefix = CacheKey::location_prefix(code)?;
            let evicted = cache.evict(code).await?;
            CacheEvictOutput { scope: prefix.trim_end_matches(':').to_string(), evicted }
        }
        None => CacheEvictOutput { scope: "all".into(), evicted: cache.evict_all().await? },
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
