//! cache_stats tool implementation.

use flightcache_core::{Error, FlightCache};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};

/// Implementation of the cache_stats tool.
pub async fn stats_impl(cache: &FlightCache) -> Result<CallToolResult, McpError> {
    let stats = cache.stats();
    let json = serde_json::to_string_pretty(&stats)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
