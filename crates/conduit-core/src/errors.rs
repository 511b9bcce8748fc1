//! Cross-cutting error types for Conduit.
//!
//! Per-record errors (`RecordParseError`, `RecordValidationError`) are never
//! fatal: the decoder and importer count them and move on. Transport, storage,
//! and orchestration errors live in their owning crates (`SourceError`,
//! `DatabaseError`, `ImportError`, `SearchError`) and converge in `conduit-cli`.

use thiserror::Error;

/// Errors that can be raised by any Conduit crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A checkpoint status transition was attempted that is not allowed.
    #[error("Invalid status transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (filter bounds, formats).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single source line that could not be decoded into a record.
///
/// `ordinal` is the zero-based position of the line among the non-blank lines
/// of its source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed record at line {ordinal}: {reason}")]
pub struct RecordParseError {
    pub ordinal: u64,
    pub reason: String,
}

impl RecordParseError {
    #[must_use]
    pub fn new(ordinal: u64, reason: impl Into<String>) -> Self {
        Self {
            ordinal,
            reason: reason.into(),
        }
    }
}

/// A decoded record that is missing a field the store requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {}: missing required field `{field}`", .id.as_deref().unwrap_or("<no id>"))]
pub struct RecordValidationError {
    /// The record identifier, when the record had one.
    pub id: Option<String>,
    /// Dotted path of the first missing field, e.g. `location.city`.
    pub field: &'static str,
}
