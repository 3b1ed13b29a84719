//! # PDT Time
//!
//! Calendar and timezone math.
//!
//! ## Modules
//!
//! - `calendar`: local-day boundary and bucketing helpers
//! - `week`: ISO-week math including the year-boundary wrap
//! - `clock`: injectable "now" for deterministic tests

pub mod calendar;
pub mod clock;
pub mod week;

pub use calendar::*;
pub use clock::*;
pub use week::*;
