//! Client code for flightcache.
//!
//! This crate provides the AirLabs schedules client, the origin that
//! the flight cache fetches from on a miss or refresh.

pub mod airlabs;

pub use airlabs::{AirLabsClient, AirLabsConfig, AirLabsError, ScheduleBatch, ScheduleRequest};
