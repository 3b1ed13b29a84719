//! Error types for the query engine.

use thiserror::Error;

/// Error types for ranking and chart queries.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Caller supplied an unusable parameter (HTTP 400 at the surface)
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// The rejected value
        value: String,
    },

    /// Requested entity does not exist (HTTP 404 at the surface)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store error
    #[error(transparent)]
    Store(#[from] pdt_store::StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
