use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{CheckpointCounters, ImportCheckpoint};
use crate::enums::CheckpointStatus;

/// Snapshot of one source's import run, handed to progress observers after
/// every committed batch and returned when the run ends.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ImportProgress {
    pub source_id: String,
    pub checkpoint_id: String,
    pub status: CheckpointStatus,
    pub records_processed: u64,
    pub records_imported: u64,
    pub errors: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// `true` unless the run completed.
    pub resumable: bool,
}

impl ImportProgress {
    /// A fresh `running` snapshot starting from `counters`.
    #[must_use]
    pub fn running(
        source_id: impl Into<String>,
        checkpoint_id: impl Into<String>,
        counters: CheckpointCounters,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            checkpoint_id: checkpoint_id.into(),
            status: CheckpointStatus::Running,
            records_processed: counters.records_processed,
            records_imported: counters.records_imported,
            errors: counters.errors,
            started_at,
            completed_at: None,
            error_message: None,
            resumable: true,
        }
    }

    #[must_use]
    pub const fn counters(&self) -> CheckpointCounters {
        CheckpointCounters {
            records_processed: self.records_processed,
            records_imported: self.records_imported,
            errors: self.errors,
        }
    }

    pub const fn apply(&mut self, counters: CheckpointCounters) {
        self.records_processed = counters.records_processed;
        self.records_imported = counters.records_imported;
        self.errors = counters.errors;
    }

    /// Move to a terminal status, stamping the completion time.
    pub fn finish(&mut self, status: CheckpointStatus, error_message: Option<String>) {
        self.status = status;
        self.completed_at = Some(Utc::now());
        self.error_message = error_message;
        self.resumable = status.is_resumable();
    }
}

impl From<&ImportCheckpoint> for ImportProgress {
    fn from(cp: &ImportCheckpoint) -> Self {
        Self {
            source_id: cp.source_id.clone(),
            checkpoint_id: cp.id.clone(),
            status: cp.status,
            records_processed: cp.records_processed,
            records_imported: cp.records_imported,
            errors: cp.errors,
            started_at: cp.started_at,
            completed_at: cp.completed_at,
            error_message: cp.error_message.clone(),
            resumable: cp.is_resumable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finishing_updates_resumability() {
        let counters = CheckpointCounters {
            records_processed: 10,
            records_imported: 8,
            errors: 2,
        };
        let mut progress = ImportProgress::running("s1", "imp-00000001", counters, Utc::now());
        assert!(progress.resumable);
        assert_eq!(progress.counters(), counters);

        progress.finish(CheckpointStatus::Paused, None);
        assert!(progress.resumable);
        assert!(progress.completed_at.is_some());

        progress.finish(CheckpointStatus::Completed, None);
        assert!(!progress.resumable);
    }
}
