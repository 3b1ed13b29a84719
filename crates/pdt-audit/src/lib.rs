//! # PDT Audit
//!
//! Verification and anomaly detection over the aggregate tables.
//!
//! The verifier recomputes each aggregate row from raw snapshots through the
//! same pure functions the aggregators use and compares against stored
//! values under explicit tolerances. It never modifies data; it only
//! reports. The anomaly detectors run over daily aggregates and are
//! advisory: consumers flag entities but publish either way.

pub mod anomaly;
pub mod error;
pub mod statistics;
pub mod types;
pub mod verifier;

pub use anomaly::AnomalyDetector;
pub use error::AuditError;
pub use statistics::{mean_and_std, median};
pub use types::{
    Anomaly, AnomalyType, AuditSummary, DisneyDownViolation, IntervalConsistencyResult,
    RowMismatch, Severity, TableAuditResult,
};
pub use verifier::AggregateVerifier;
