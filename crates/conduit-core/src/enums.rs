//! Status and backend enums for Conduit.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for SQL storage.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CheckpointStatus
// ---------------------------------------------------------------------------

/// Status of one import run attempt against a source.
///
/// ```text
/// running → completed
///         → failed
///         → paused
/// ```
///
/// Every status except `completed` leaves the run resumable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Running,
    Completed,
    Failed,
    Paused,
}

impl CheckpointStatus {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Running => &[Self::Completed, Self::Failed, Self::Paused],
            Self::Completed | Self::Failed | Self::Paused => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Whether a later run may continue from this checkpoint's offset.
    #[must_use]
    pub const fn is_resumable(self) -> bool {
        !matches!(self, Self::Completed)
    }

    /// Whether the run recorded by this checkpoint has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SearchBackendKind
// ---------------------------------------------------------------------------

/// Which search backend produced a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackendKind {
    /// Query against the structured store's indexed columns.
    Indexed,
    /// Sequential scan of the remote sources.
    Streaming,
}

impl SearchBackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Indexed => "indexed",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for SearchBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_can_reach_every_terminal_status() {
        for next in [
            CheckpointStatus::Completed,
            CheckpointStatus::Failed,
            CheckpointStatus::Paused,
        ] {
            assert!(CheckpointStatus::Running.can_transition_to(next));
        }
        assert!(!CheckpointStatus::Running.can_transition_to(CheckpointStatus::Running));
    }

    #[test]
    fn terminal_statuses_are_final() {
        for status in [
            CheckpointStatus::Completed,
            CheckpointStatus::Failed,
            CheckpointStatus::Paused,
        ] {
            assert!(status.allowed_next_states().is_empty());
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn only_completed_is_not_resumable() {
        assert!(CheckpointStatus::Running.is_resumable());
        assert!(CheckpointStatus::Failed.is_resumable());
        assert!(CheckpointStatus::Paused.is_resumable());
        assert!(!CheckpointStatus::Completed.is_resumable());
    }

    #[test]
    fn serde_matches_sql_representation() {
        for status in [
            CheckpointStatus::Running,
            CheckpointStatus::Completed,
            CheckpointStatus::Failed,
            CheckpointStatus::Paused,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.as_str().to_string()));
        }
        assert_eq!(SearchBackendKind::Streaming.to_string(), "streaming");
    }
}
