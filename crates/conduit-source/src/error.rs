//! Source error types.

use thiserror::Error;

/// Errors that abort a decode call.
///
/// Every variant is fatal to the current call; per-line problems are reported
/// as [`crate::Decoded::Malformed`] instead.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP transport error (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source endpoint returned a non-success status code.
    #[error("source {source_id} returned {status}: {message}")]
    Status {
        source_id: String,
        status: u16,
        message: String,
    },

    /// The source endpoint returned 429 Too Many Requests.
    #[error("source {source_id} rate limited; retry after {retry_after_secs}s")]
    RateLimited {
        source_id: String,
        retry_after_secs: u64,
    },

    /// Local file read error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No source exists under this identifier.
    #[error("source not found: {0}")]
    NotFound(String),

    /// The source location cannot be used (bad base URL, escaping path).
    #[error("invalid source location: {0}")]
    InvalidLocation(String),
}
