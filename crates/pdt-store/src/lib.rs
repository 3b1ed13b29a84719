//! # PDT Store
//!
//! Repositories over the observation tables.
//!
//! Ownership model: the collector is the only writer of snapshot tables, the
//! aggregators are the only writers of their aggregate tables, and the
//! `AggregationLog` row transitioning `running -> success | failed` guards
//! both exactly-once semantics and snapshot retention. Readers are fully
//! concurrent and must tolerate partial aggregation windows.

pub mod aggregation_log;
pub mod db;
pub mod error;
pub mod parks;
pub mod retention;
pub mod rides;
pub mod snapshots;

pub use aggregation_log::AggregationLogRepository;
pub use db::{connect, run_migrations};
pub use error::StoreError;
pub use parks::{ParkRepository, VendorPark};
pub use rides::{RideRepository, VendorRide};
pub use retention::RetentionPruner;
pub use snapshots::{CycleWrite, SnapshotRepository};
