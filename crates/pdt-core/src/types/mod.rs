//! Domain types shared across the workspace.

mod park;
mod ride;
mod snapshot;
mod stats;

pub use park::{OperatorSemantics, Park, ParkId};
pub use ride::{tier_weight, Ride, RideCategory, RideId, RideStatus, DEFAULT_TIER_WEIGHT};
pub use snapshot::{
    NewParkActivitySnapshot, NewRideStatusSnapshot, ParkActivitySnapshot, RideStatusSnapshot,
};
pub use stats::{
    AggregationLogEntry, AggregationStatus, AggregationType, OperatingSession, ParkDailyStats,
    ParkHourlyStats, ParkWeeklyStats, RideDailyStats, RideHourlyStats, RideWeeklyStats,
};
