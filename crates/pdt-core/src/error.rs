//! Shared error types for data-integrity failures.
//!
//! Crate-specific error enums wrap these where a database row or upstream
//! payload fails validation. Internal plumbing uses `anyhow::Result`.

use thiserror::Error;

/// Errors raised when stored or ingested data violates the domain model.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A database column held a value outside its enum domain.
    #[error("invalid {column} value in database: {value}")]
    InvalidEnum {
        /// Column that failed to parse
        column: &'static str,
        /// The offending value
        value: String,
    },

    /// A park row carried a timezone that is not a valid IANA zone.
    #[error("invalid IANA timezone: {0}")]
    InvalidTimezone(String),

    /// A referenced entity does not exist.
    #[error("unknown {entity} id {id}")]
    UnknownEntity {
        /// Entity kind ("park", "ride")
        entity: &'static str,
        /// The missing id
        id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidEnum {
            column: "status",
            value: "EXPLODED".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid status value in database: EXPLODED"
        );

        let err = DomainError::UnknownEntity {
            entity: "park",
            id: 42,
        };
        assert_eq!(err.to_string(), "unknown park id 42");
    }
}
