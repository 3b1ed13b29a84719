//! Aggregate row types and the aggregation job log.
//!
//! Every aggregate table keys on its natural key (`(ride_id, hour_start_utc)`,
//! `(park_id, stat_date)`, ...) so upsert-on-conflict is well defined and
//! rerunning a job converges to the same rows.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::park::ParkId;
use super::ride::RideId;
use crate::error::DomainError;

/// One row per `(ride, hour)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RideHourlyStats {
    pub ride_id: RideId,
    pub park_id: ParkId,
    pub hour_start_utc: DateTime<Utc>,
    /// Average wait while operating, two decimals
    pub avg_wait_time_minutes: Option<Decimal>,
    pub operating_snapshots: i32,
    /// Park-type-aware down count (see the score crate)
    pub down_snapshots: i32,
    pub downtime_hours: Decimal,
    pub uptime_percentage: Decimal,
    pub snapshot_count: i32,
    /// TRUE iff the ride was observed operating at any point during the
    /// Pacific calendar day containing this hour. Keeps multi-hour outages
    /// counted in hours after the breakdown.
    pub ride_operated: bool,
}

/// One row per `(park, hour)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParkHourlyStats {
    pub park_id: ParkId,
    pub hour_start_utc: DateTime<Utc>,
    /// Mean of the per-snapshot scores stamped at collection time
    pub shame_score: Option<Decimal>,
    pub avg_wait_time_minutes: Option<Decimal>,
    pub rides_operating: Option<i32>,
    pub rides_down: Option<i32>,
    pub total_downtime_hours: Decimal,
    pub weighted_downtime_hours: Decimal,
    /// Tier-weight sum of rides inside the operated window at this hour
    pub effective_park_weight: Decimal,
    pub snapshot_count: i32,
    pub park_was_open: bool,
}

/// One row per `(ride, local date)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RideDailyStats {
    pub ride_id: RideId,
    pub stat_date: NaiveDate,
    pub uptime_minutes: i32,
    pub downtime_minutes: i32,
    pub uptime_percentage: Decimal,
    /// Minutes the park was open that day (the denominator)
    pub operating_hours_minutes: i32,
    pub avg_wait_time: Option<Decimal>,
    pub min_wait_time: Option<i32>,
    pub max_wait_time: Option<i32>,
    pub peak_wait_time: Option<i32>,
    /// Transitions into a down state
    pub status_changes: i32,
    pub longest_downtime_minutes: Option<i32>,
    pub ride_operated: bool,
    pub metrics_version: i16,
}

/// One row per `(park, local date)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParkDailyStats {
    pub park_id: ParkId,
    pub stat_date: NaiveDate,
    /// Mean of stamped per-snapshot scores across the local day
    pub shame_score: Option<Decimal>,
    pub total_downtime_hours: Decimal,
    pub weighted_downtime_hours: Decimal,
    pub avg_uptime_percentage: Decimal,
    pub rides_with_downtime: i32,
    pub total_rides_tracked: i32,
    pub operating_hours_minutes: i32,
    pub effective_park_weight: Decimal,
    pub metrics_version: i16,
}

/// First-open-to-last-open interval for one park on one local calendar day.
/// Canonical denominator for ride uptime percentages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OperatingSession {
    pub park_id: ParkId,
    pub operating_date: NaiveDate,
    pub first_open_utc: DateTime<Utc>,
    pub last_open_utc: DateTime<Utc>,
    pub operating_minutes: i32,
}

/// ISO-week rollup per ride.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RideWeeklyStats {
    pub ride_id: RideId,
    pub year: i32,
    pub week_number: i32,
    pub week_start_date: NaiveDate,
    pub uptime_minutes: i32,
    pub downtime_minutes: i32,
    pub uptime_percentage: Decimal,
    pub operating_hours_minutes: i32,
    pub avg_wait_time: Option<Decimal>,
    pub peak_wait_time: Option<i32>,
    pub status_changes: i32,
    /// Signed percent change vs the previous ISO week; NULL when the
    /// previous week is missing or had zero downtime
    pub trend_vs_previous: Option<Decimal>,
}

/// ISO-week rollup per park.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParkWeeklyStats {
    pub park_id: ParkId,
    pub year: i32,
    pub week_number: i32,
    pub week_start_date: NaiveDate,
    pub total_rides_tracked: i32,
    pub avg_uptime_percentage: Option<Decimal>,
    pub total_downtime_hours: Decimal,
    pub rides_with_downtime: i32,
    pub avg_wait_time: Option<Decimal>,
    pub peak_wait_time: Option<i32>,
    pub trend_vs_previous: Option<Decimal>,
}

/// Kind of aggregation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl AggregationType {
    /// Database string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parse a database string.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(DomainError::InvalidEnum {
                column: "aggregation_type",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for AggregationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job execution state. The `running -> success | failed` transition guards
/// against concurrent aggregator instances and gates snapshot retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStatus {
    Running,
    Success,
    Failed,
}

impl AggregationStatus {
    /// Database string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Parse a database string.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::InvalidEnum {
                column: "status",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for AggregationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row per aggregation job execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationLogEntry {
    pub log_id: i64,
    pub aggregation_date: NaiveDate,
    pub aggregation_type: AggregationType,
    /// End of the window this run covered, UTC
    pub aggregated_until_ts: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: AggregationStatus,
    pub parks_processed: i32,
    pub rides_processed: i32,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_type_round_trip() {
        for t in [
            AggregationType::Hourly,
            AggregationType::Daily,
            AggregationType::Weekly,
            AggregationType::Monthly,
        ] {
            assert_eq!(AggregationType::parse(t.as_str()).unwrap(), t);
        }
        assert!(AggregationType::parse("yearly").is_err());
    }

    #[test]
    fn test_aggregation_status_round_trip() {
        for s in [
            AggregationStatus::Running,
            AggregationStatus::Success,
            AggregationStatus::Failed,
        ] {
            assert_eq!(AggregationStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(AggregationStatus::parse("done").is_err());
    }
}
