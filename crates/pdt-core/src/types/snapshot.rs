//! Snapshot records written by the collector.
//!
//! One `RideStatusSnapshot` per `(ride, recorded_at)` and one
//! `ParkActivitySnapshot` per `(park, recorded_at)` per collection cycle.
//! Snapshots are append-only; readers join ride and park rows on the minute
//! bucket of `recorded_at`, never on exact equality.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::park::ParkId;
use super::ride::{RideId, RideStatus};

/// Point-in-time ride status observation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RideStatusSnapshot {
    pub snapshot_id: i64,
    pub ride_id: RideId,
    /// UTC collection timestamp
    pub recorded_at: DateTime<Utc>,
    /// Raw is_open flag from the upstream API
    pub is_open: Option<bool>,
    /// Raw status from the upstream API
    pub status: Option<RideStatus>,
    /// Wait time in minutes (NULL if not reported)
    pub wait_time: Option<i32>,
    /// Last update timestamp reported by the upstream API
    pub last_updated_api: DateTime<Utc>,
    /// TRUE iff status is OPERATING, or status is missing and a positive
    /// wait time was reported
    pub computed_is_open: bool,
    /// Stamped from the sibling park snapshot in the same cycle
    pub park_appears_open: bool,
}

/// Insert form of a ride snapshot (id assigned by the database).
#[derive(Debug, Clone)]
pub struct NewRideStatusSnapshot {
    pub ride_id: RideId,
    pub recorded_at: DateTime<Utc>,
    pub is_open: Option<bool>,
    pub status: Option<RideStatus>,
    pub wait_time: Option<i32>,
    pub last_updated_api: DateTime<Utc>,
    pub computed_is_open: bool,
    pub park_appears_open: bool,
}

/// Point-in-time park activity observation, derived from the ride snapshots
/// of the same cycle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParkActivitySnapshot {
    pub snapshot_id: i64,
    pub park_id: ParkId,
    /// UTC collection timestamp
    pub recorded_at: DateTime<Utc>,
    pub total_rides_tracked: i32,
    pub rides_open: i32,
    pub rides_closed: i32,
    /// Average wait across operating rides
    pub avg_wait_time: Option<Decimal>,
    /// Maximum wait across all rides
    pub max_wait_time: Option<i32>,
    /// Canonical "is this park operating right now" decision
    pub park_appears_open: bool,
    /// Shame score computed once at collection time; the authoritative value
    /// for LIVE and the per-snapshot stream
    pub shame_score: Option<Decimal>,
}

impl ParkActivitySnapshot {
    /// Park-open fallback heuristic: schedules are frequently missing or
    /// stale, so live activity overrides a closed-looking schedule.
    #[must_use]
    pub const fn effectively_open(&self) -> bool {
        self.park_appears_open || self.rides_open > 0
    }
}

/// Insert form of a park snapshot.
#[derive(Debug, Clone)]
pub struct NewParkActivitySnapshot {
    pub park_id: ParkId,
    pub recorded_at: DateTime<Utc>,
    pub total_rides_tracked: i32,
    pub rides_open: i32,
    pub rides_closed: i32,
    pub avg_wait_time: Option<Decimal>,
    pub max_wait_time: Option<i32>,
    pub park_appears_open: bool,
    pub shame_score: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn park_snapshot(park_appears_open: bool, rides_open: i32) -> ParkActivitySnapshot {
        ParkActivitySnapshot {
            snapshot_id: 1,
            park_id: ParkId(1),
            recorded_at: Utc::now(),
            total_rides_tracked: 10,
            rides_open,
            rides_closed: 10 - rides_open,
            avg_wait_time: None,
            max_wait_time: None,
            park_appears_open,
            shame_score: None,
        }
    }

    #[test]
    fn test_effectively_open_fallback() {
        // Schedule says open
        assert!(park_snapshot(true, 0).effectively_open());
        // Schedule gap, but live activity shows rides running
        assert!(park_snapshot(false, 3).effectively_open());
        // Genuinely closed
        assert!(!park_snapshot(false, 0).effectively_open());
    }
}
