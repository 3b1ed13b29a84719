//! # PDT Core
//!
//! Shared domain types for the park downtime tracker.
//!
//! This crate provides:
//! - Entity types (`Park`, `Ride`) and their identifiers
//! - Snapshot records written by the collector
//! - Aggregate row types for hourly/daily/weekly/monthly statistics
//! - The `AggregationLog` job marker
//! - Tier-weight mapping and rounding helpers
//! - Result type alias using `anyhow` for internal operations

pub mod error;
pub mod rounding;
pub mod types;

// Re-export commonly used types at crate root
pub use error::DomainError;
pub use rounding::{round1, round2};
pub use types::{
    tier_weight, AggregationLogEntry, AggregationStatus, AggregationType,
    NewParkActivitySnapshot, NewRideStatusSnapshot, OperatingSession, OperatorSemantics, Park,
    ParkActivitySnapshot, ParkDailyStats, ParkHourlyStats, ParkId, ParkWeeklyStats, Ride,
    RideCategory, RideDailyStats, RideHourlyStats, RideId, RideStatus, RideStatusSnapshot,
    RideWeeklyStats, DEFAULT_TIER_WEIGHT,
};

/// Result type alias for internal operations using `anyhow`
pub type Result<T> = anyhow::Result<T>;
