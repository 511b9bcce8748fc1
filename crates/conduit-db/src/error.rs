//! Database error types for conduit-db.

use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned data that could not be parsed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration or connection setup failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., finalizing an already-final checkpoint).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One record that could not be written inside an otherwise committed batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to write inspection {id}: {reason}")]
pub struct BatchWriteError {
    pub id: String,
    pub reason: String,
}
