//! Error types for store operations.

use pdt_core::DomainError;
use thiserror::Error;

/// Error types for observation-store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data violates the domain model
    #[error("Data integrity error: {0}")]
    Integrity(#[from] DomainError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
