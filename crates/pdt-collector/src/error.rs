//! Error types for collection operations.

use thiserror::Error;

/// Error types for the collector.
#[derive(Error, Debug)]
pub enum CollectError {
    /// Upstream fetch failed after retries
    #[error("Upstream fetch failed for park {park}: {message}")]
    Upstream {
        /// Vendor park id
        park: i64,
        /// Failure detail
        message: String,
    },

    /// Upstream payload did not parse
    #[error("Upstream payload invalid: {0}")]
    Payload(String),

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
