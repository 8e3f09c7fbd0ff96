//! Cache administration MCP tools.

pub mod evict;
pub mod stats;

pub use evict::{CacheEvictParams, evict_impl};
pub use stats::stats_impl;
