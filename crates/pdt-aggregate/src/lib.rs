//! # PDT Aggregate
//!
//! Collapses the raw snapshot stream into hourly, daily, weekly, and monthly
//! statistics.
//!
//! All per-entity math lives in pure functions over fetched snapshot slices
//! (`compute`, `timeline`, `sessions`); the aggregator structs only fetch,
//! iterate, and upsert. The audit crate recomputes through the same pure
//! functions, which is what makes stored and recomputed values comparable.
//!
//! Failure policy: a bad ride does not abort its hour, a bad park does not
//! abort its day; anything environment-level marks the `AggregationLog` row
//! `failed` and exits non-zero.

pub mod compute;
pub mod daily;
pub mod error;
pub mod hourly;
pub mod recompute;
pub mod rollup;
pub mod sessions;
pub mod store;
pub mod timeline;

pub use compute::{
    compute_park_day, compute_park_hour, compute_ride_day, compute_ride_hour, SnapObs,
};
pub use daily::{DailyAggregator, DailyOutcome, WriteOptions};
pub use error::AggregateError;
pub use hourly::{HourlyAggregator, HourlyOutcome};
pub use recompute::{DailyStatsRecomputer, RecomputeOutcome};
pub use rollup::{trend_pct, MonthlyAggregator, WeeklyAggregator};
pub use sessions::detect_operating_session;
pub use store::{ParkRollupSums, RideRollupSums, StatsRepository};
pub use timeline::{summarize_operating_timeline, TimelineSummary};
