//! Import error types.

use conduit_db::error::DatabaseError;
use conduit_source::SourceError;
use thiserror::Error;

/// Errors that stop an import before or outside the per-batch loop.
///
/// Per-record problems never surface here; they are counted in the run's
/// `errors` counter. A run that starts and then fails is reported as an
/// `ImportProgress` with status `failed`, not as an `Err`.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Another run is already active on this manager.
    #[error("an import is already in progress")]
    Conflict,

    /// `resume` was requested but the source has no resumable checkpoint.
    #[error("no resumable checkpoint for source {source_id}")]
    ResumeUnavailable { source_id: String },

    /// The byte source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The store or checkpoint ledger failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Importer settings that cannot drive a run.
    #[error("invalid import configuration: {0}")]
    InvalidConfig(String),

    /// A spawned run panicked or was cancelled.
    #[error("import task failed: {0}")]
    Task(String),
}
