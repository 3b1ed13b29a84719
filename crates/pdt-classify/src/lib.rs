//! # PDT Classify
//!
//! Read-mostly classification store.
//!
//! The AI classification pipeline is an external collaborator; this crate
//! consumes its persisted output as a pure `(ride -> tier, weight, category)`
//! lookup. Human override rows win over classifier output, unknown rides get
//! the default weight, and the in-memory cache is invalidated wholesale when
//! the classifier bumps its schema version.

pub mod store;
pub mod types;

pub use store::ClassificationStore;
pub use types::{Classification, ClassificationOverride, RideClass};
