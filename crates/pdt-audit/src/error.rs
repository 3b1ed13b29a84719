//! Error types for audit operations.

use thiserror::Error;

/// Error types for verification and anomaly detection.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store error
    #[error(transparent)]
    Store(#[from] pdt_store::StoreError),

    /// Aggregate recomputation error
    #[error(transparent)]
    Aggregate(#[from] pdt_aggregate::AggregateError),

    /// Stored data violates the domain model
    #[error("Data integrity error: {0}")]
    Integrity(#[from] pdt_core::DomainError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
