//! Core types and shared functionality for flightcache.
//!
//! This crate provides:
//! - The multi-layer flight schedule cache
//! - SQLite backing store and persistent cache store
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod flight;
pub mod origin;
pub mod store;

pub use cache::{CacheKey, CachePolicy, Direction, FlightCache, Lookup, LookupOutcome};
pub use clock::{Clock, SystemClock};
pub use config::AppConfig;
pub use db::FlightDb;
pub use error::Error;
pub use flight::{FlightIdentity, FlightRecord};
pub use origin::OriginFetcher;
pub use store::{BatchWrite, FlightStore, RejectedRecord};
