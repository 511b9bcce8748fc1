//! Search error types for conduit-search.

use conduit_core::errors::CoreError;
use conduit_db::error::DatabaseError;
use conduit_source::SourceError;

/// Errors from search operations across the indexed and streaming backends.
///
/// A search either returns a complete, well-formed page or one of these.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Error from the structured store.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Error opening or reading a remote source.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// The filter can never match (non-finite or inverted score bounds).
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The requested backend is not configured.
    #[error("search backend unavailable: {0}")]
    Unavailable(String),
}

impl From<CoreError> for SearchError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::InvalidFilter(msg),
            other => Self::InvalidFilter(other.to_string()),
        }
    }
}
