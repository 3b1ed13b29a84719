//! # PDT Score
//!
//! Single source of truth for shame-score semantics.
//!
//! The park-type-aware DOWN rules and the park-open fallback heuristic must be
//! identical in every code path that touches them: the collector stamping
//! scores, the aggregators, the audit recomputation, and the raw-snapshot
//! query paths. This crate holds both mirrored forms:
//!
//! - `rules` / `calculator`: pure Rust predicates and formulas
//! - `sql`: the SQL fragments embedded by every raw-path query
//!
//! A change to one side is a change to both; the fragment tests pin the
//! SQL text to the rule semantics.

pub mod calculator;
pub mod rules;
pub mod sql;

pub use calculator::{
    effective_park_weight, full_roster_weight, operated_window_days, operated_window_start,
    score_at_instant, shame_score, RideObservation, ShameBreakdown, SHAME_SCORE_MULTIPLIER,
};
pub use rules::{computed_is_open, counts_as_downtime, is_down, operated_signal};
