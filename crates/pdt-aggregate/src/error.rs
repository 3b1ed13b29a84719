//! Error types for aggregation jobs.

use pdt_core::DomainError;
use thiserror::Error;

/// Error types for aggregation operations.
#[derive(Error, Debug)]
pub enum AggregateError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store error
    #[error(transparent)]
    Store(#[from] pdt_store::StoreError),

    /// Stored data violates the domain model
    #[error("Data integrity error: {0}")]
    Integrity(#[from] DomainError),

    /// Job stopped by an external signal; counts so far are preserved in the
    /// aggregation log
    #[error("Aggregation cancelled after {parks_processed} parks")]
    Cancelled {
        /// Parks completed before the stop signal
        parks_processed: i32,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
