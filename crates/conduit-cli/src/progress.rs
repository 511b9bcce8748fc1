use std::time::Duration;

use conduit_core::progress::ImportProgress;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ui;

/// A stderr spinner, or nothing when progress display is off.
#[derive(Clone)]
pub struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    #[must_use]
    pub fn spinner(message: &str) -> Self {
        if !ui::prefs().progress {
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        Self { bar: Some(bar) }
    }

    pub fn set_message(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    pub fn finish_ok(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }

    pub fn finish_err(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.abandon_with_message(message.to_string());
        }
    }

    /// Mirror import snapshots into the spinner message until the feed closes
    /// or the returned task is aborted.
    pub fn follow(&self, mut feed: watch::Receiver<Option<ImportProgress>>) -> JoinHandle<()> {
        let progress = self.clone();
        tokio::spawn(async move {
            while feed.changed().await.is_ok() {
                let snapshot = feed.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    progress.set_message(&describe(&snapshot));
                }
            }
        })
    }
}

/// One-line summary of a progress snapshot.
#[must_use]
pub fn describe(progress: &ImportProgress) -> String {
    format!(
        "{} [{}] {} processed, {} imported, {} errors",
        progress.source_id,
        progress.status,
        progress.records_processed,
        progress.records_imported,
        progress.errors
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use conduit_core::entities::CheckpointCounters;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn describe_includes_counters() {
        let snapshot = ImportProgress::running(
            "a.jsonl",
            "imp-00000001",
            CheckpointCounters {
                records_processed: 12,
                records_imported: 10,
                errors: 2,
            },
            Utc::now(),
        );
        assert_eq!(
            describe(&snapshot),
            "a.jsonl [running] 12 processed, 10 imported, 2 errors"
        );
    }
}
