//! flightcache server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use flightcache_client::AirLabsClient;
use flightcache_core::cache::CacheStore;
use flightcache_core::config::CacheBackend;
use flightcache_core::{AppConfig, FlightCache, FlightDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::time::{MissedTickBehavior, interval};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    tracing::info!(db_path = %config.db_path.display(), backend = ?config.cache_backend, "Starting flightcache server on stdio transport");

    let db = Arc::new(
        FlightDb::open(&config.db_path)
            .await
            .with_context(|| format!("opening {}", config.db_path.display()))?,
    );
    let purged = db.purge_expired().await?;
    if purged > 0 {
        tracing::info!(purged, "purged expired cache entries");
    }

    let origin = AirLabsClient::from_app_config(&config)?;

    let mut builder = FlightCache::builder(Arc::new(origin), Arc::clone(&db) as _).policy(config.cache_policy());
    if config.cache_backend == CacheBackend::Sqlite {
        builder = builder.entries(Arc::clone(&db) as _);
    }
    let cache = builder.build();

    let sweeper = cache.clone();
    let period = config.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let dropped = sweeper.sweep().await;
            tracing::debug!(dropped, "periodic sweep");
        }
    });

    let handler = handler::FlightCacheServer::new(cache);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
