//! MCP tool implementations.
//!
//! This module contains all tools exposed by the flightcache server.

pub mod cache;
pub mod schedules;
