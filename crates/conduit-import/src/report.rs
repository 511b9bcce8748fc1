//! Aggregate result of a multi-source run.

use conduit_core::enums::CheckpointStatus;
use conduit_core::progress::ImportProgress;
use serde::Serialize;

use crate::error::ImportError;

/// Per-source results of one run, in the order the sources were attempted.
///
/// The run stops at the first source that fails or pauses, so every entry but
/// the last is `completed`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub sources: Vec<ImportProgress>,
    /// Sources a resumed run skipped because their latest run completed.
    pub skipped: Vec<String>,
    /// The source that could not be started, and why.
    pub aborted: Option<AbortedSource>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AbortedSource {
    pub source_id: String,
    pub error: String,
}

impl ImportReport {
    pub(crate) fn abort(&mut self, source_id: &str, error: &ImportError) {
        tracing::warn!(source_id, %error, "source could not be started");
        self.aborted = Some(AbortedSource {
            source_id: source_id.to_string(),
            error: error.to_string(),
        });
    }

    /// Overall outcome: `failed` if any source failed or could not start,
    /// `paused` if the run was stopped, otherwise `completed`.
    #[must_use]
    pub fn status(&self) -> CheckpointStatus {
        if self.aborted.is_some() {
            return CheckpointStatus::Failed;
        }
        self.sources
            .last()
            .map_or(CheckpointStatus::Completed, |last| last.status)
    }

    #[must_use]
    pub fn records_processed(&self) -> u64 {
        self.sources.iter().map(|p| p.records_processed).sum()
    }

    #[must_use]
    pub fn records_imported(&self) -> u64 {
        self.sources.iter().map(|p| p.records_imported).sum()
    }

    #[must_use]
    pub fn errors(&self) -> u64 {
        self.sources.iter().map(|p| p.errors).sum()
    }

    /// The progress entry for `source_id`, if it was attempted.
    #[must_use]
    pub fn source(&self, source_id: &str) -> Option<&ImportProgress> {
        self.sources.iter().find(|p| p.source_id == source_id)
    }
}
