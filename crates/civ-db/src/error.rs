//! Error types for the event log.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors, plus rows that cannot be decoded back into domain types.

/// Errors that can occur in the event log.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row holds a value that does not map onto the domain model
    /// (unknown event tag, malformed agent id, negative turn).
    #[error("invalid {column} in stored row: {message}")]
    InvalidRow {
        /// Column that failed to decode.
        column: &'static str,
        /// Decoder error.
        message: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Build an [`DbError::InvalidRow`] from any displayable decode error.
    pub fn invalid_row(column: &'static str, err: impl std::fmt::Display) -> Self {
        Self::InvalidRow {
            column,
            message: err.to_string(),
        }
    }
}
