//! # PDT Query
//!
//! Answers ranking and chart requests over a fixed menu of named periods.
//!
//! Each period maps to a primary source: LIVE reads stored per-snapshot
//! scores, TODAY unions complete hours from the hourly aggregates with the
//! current partial hour from raw snapshots, YESTERDAY reads the daily
//! aggregate, and the trailing windows read daily rows. A config flag drops
//! every period that supports it onto the raw-snapshot slow path; the two
//! paths agree within the audit tolerances.
//!
//! Raw-path SQL is assembled from the fragments in `pdt-score`; the
//! park-type-aware DOWN rules and the park-open fallback heuristic are never
//! restated here.

pub mod charts;
pub mod engine;
pub mod error;
pub mod parks;
pub mod period;
pub mod rides;
pub mod types;

pub use engine::QueryEngine;
pub use error::QueryError;
pub use period::Period;
pub use types::{
    Attribution, Granularity, ParkRankingEntry, RankingFilter, RankingResponse, RideRankingEntry,
    SortBy, TimeSeriesResponse,
};
