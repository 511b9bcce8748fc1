use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::CheckpointStatus;

/// The three counters every checkpoint carries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CheckpointCounters {
    /// Non-blank source lines consumed so far. Doubles as the resume offset.
    pub records_processed: u64,
    pub records_imported: u64,
    pub errors: u64,
}

/// One import run attempt against a source.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ImportCheckpoint {
    pub id: String,
    pub source_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: u64,
    pub records_imported: u64,
    pub errors: u64,
    pub status: CheckpointStatus,
    pub error_message: Option<String>,
}

impl ImportCheckpoint {
    #[must_use]
    pub const fn counters(&self) -> CheckpointCounters {
        CheckpointCounters {
            records_processed: self.records_processed,
            records_imported: self.records_imported,
            errors: self.errors,
        }
    }

    #[must_use]
    pub const fn is_resumable(&self) -> bool {
        self.status.is_resumable()
    }
}
