//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::cache::{CacheEvictParams, evict_impl, stats_impl};
use crate::tools::schedules::{FlightSchedulesParams, schedules_impl};

use flightcache_core::FlightCache;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for flightcache.
#[derive(Clone)]
pub struct FlightCacheServer {
    tool_router: ToolRouter<Self>,
    cache: FlightCache,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl FlightCacheServer {
    /// Create a new server handler around a shared cache.
    pub fn new(cache: FlightCache) -> Self {
        Self { tool_router: Self::tool_router(), cache }
    }

    /// Look up flight schedules for an airport.
    ///
    /// Hot locations are cached longer; stale answers are returned immediately
    /// while a background refresh runs.
    #[tool(
        description = "Flight schedules for an airport (IATA/ICAO code) as arrivals or departures. Served from cache when possible; set force_refresh to fetch from the provider."
    )]
    async fn flight_schedules(&self, params: Parameters<FlightSchedulesParams>) -> Result<CallToolResult, McpError> {
        schedules_impl(&self.cache, params.0).await
    }

    #[tool(description = "Evict cached schedules, empty-location markers and call counters for one airport, or everything.")]
    async fn cache_evict(&self, params: Parameters<CacheEvictParams>) -> Result<CallToolResult, McpError> {
        evict_impl(&self.cache, params.0).await
    }

    #[tool(description = "Per-key call counts with hot/cold classification, empty-location markers and refreshes in flight.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.cache).await
    }
}

impl ServerHandler for FlightCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "flightcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubOrigin, test_cache};

    #[tokio::test]
    async fn test_lists_all_tools() {
        let cache = test_cache(&StubOrigin::with_flights(1)).await;
        let server = FlightCacheServer::new(cache);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();

        assert_eq!(names, ["cache_evict", "cache_stats", "flight_schedules"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let cache = test_cache(&StubOrigin::with_flights(1)).await;
        let info = FlightCacheServer::new(cache).get_info();
        assert_eq!(info.server_info.name, "flightcache");
        assert!(info.capabilities.tools.is_some());
    }
}
