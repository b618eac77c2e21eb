//! Store error types

use thiserror::Error;

/// Errors returned by [`JobStore`](crate::JobStore) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested job does not exist.
    #[error("job {0} not found")]
    NotFound(String),

    /// A job with the same id already exists.
    #[error("job {0} already exists")]
    AlreadyExists(String),

    /// A persisted status column holds a value the domain does not know.
    #[error("job {id} has invalid status value '{value}'")]
    InvalidStatus { id: String, value: String },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
