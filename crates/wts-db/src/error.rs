//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] and [`serde_json`] errors. Callers above the store boundary
//! see them as [`StoreError`].

use wts_core::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored column holds a value the domain types reject.
    #[error("Invalid value in column {column}: {message}")]
    InvalidColumn {
        /// The offending column.
        column: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Serialization(_) | DbError::InvalidColumn { .. } => Self::Corrupt {
                message: err.to_string(),
            },
            DbError::Postgres(_) | DbError::Migration(_) | DbError::Config(_) => {
                Self::Unavailable {
                    message: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_map_to_corrupt() {
        let err = DbError::InvalidColumn {
            column: "phase",
            message: "phase 11 is outside 1..=10".to_owned(),
        };
        assert!(matches!(StoreError::from(err), StoreError::Corrupt { .. }));
    }

    #[test]
    fn connection_failures_map_to_unavailable() {
        let err = DbError::Postgres(sqlx::Error::PoolTimedOut);
        let store_err = StoreError::from(err);
        assert!(matches!(store_err, StoreError::Unavailable { .. }));
        assert!(store_err.to_string().contains("PostgreSQL error"));
    }
}
