//! # PDT Collector
//!
//! Polls the upstream ride-status API on a fixed cadence and writes one
//! `RideStatusSnapshot` per ride plus one `ParkActivitySnapshot` per park per
//! cycle, atomically per park.
//!
//! Per-park fetches fan out with a bounded concurrency ceiling; a failing
//! park is retried a bounded number of times and then skipped for the cycle,
//! producing no synthetic data. The park's shame score is computed once here,
//! at collection time, and every downstream consumer reads the stored value.

pub mod client;
pub mod cycle;
pub mod error;
pub mod service;

pub use client::{ApiRide, QueueTimesClient, VendorParkListing};
pub use cycle::{build_park_cycle, ParkCycle};
pub use error::CollectError;
pub use service::{Collector, CycleSummary};
