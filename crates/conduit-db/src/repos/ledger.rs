//! Checkpoint ledger repository.
//!
//! One row per import run attempt. The importer creates a row at run start,
//! records progress after every committed batch, and finalizes it once.
//! Resume offsets are read back from here and nowhere else.

use chrono::Utc;

use conduit_core::entities::{CheckpointCounters, ImportCheckpoint};
use conduit_core::enums::CheckpointStatus;
use conduit_core::ids::PREFIX_CHECKPOINT;

use crate::Store;
use crate::error::DatabaseError;
use crate::helpers::{
    count_param, format_datetime, get_count, get_opt_string, parse_datetime, parse_enum,
    parse_optional_datetime,
};

const SELECT_CHECKPOINT: &str = "SELECT id, source_id, started_at, completed_at, \
     records_processed, records_imported, errors, status, error_message FROM import_checkpoints";

fn row_to_checkpoint(row: &libsql::Row) -> Result<ImportCheckpoint, DatabaseError> {
    let completed_at_str = get_opt_string(row, 3)?;
    let status_str: String = row.get(7)?;
    Ok(ImportCheckpoint {
        id: row.get(0)?,
        source_id: row.get(1)?,
        started_at: parse_datetime(&row.get::<String>(2)?)?,
        completed_at: parse_optional_datetime(completed_at_str.as_deref())?,
        records_processed: get_count(row, 4)?,
        records_imported: get_count(row, 5)?,
        errors: get_count(row, 6)?,
        status: parse_enum(&status_str)?,
        error_message: get_opt_string(row, 8)?,
    })
}

impl Store {
    /// Open a `running` checkpoint for a new run attempt on `source_id`,
    /// starting from `start` (zero for a fresh run, the carried-forward
    /// counters for a resume).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn create_checkpoint(
        &self,
        source_id: &str,
        start: CheckpointCounters,
    ) -> Result<ImportCheckpoint, DatabaseError> {
        let id = self.generate_id(PREFIX_CHECKPOINT).await?;
        let now = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO import_checkpoints
                 (id, source_id, started_at, records_processed, records_imported, errors, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'running')",
                libsql::params![
                    id.as_str(),
                    source_id,
                    format_datetime(&now),
                    count_param(start.records_processed),
                    count_param(start.records_imported),
                    count_param(start.errors)
                ],
            )
            .await?;

        tracing::debug!(checkpoint_id = %id, source_id, ?start, "checkpoint created");
        Ok(ImportCheckpoint {
            id,
            source_id: source_id.to_string(),
            started_at: now,
            completed_at: None,
            records_processed: start.records_processed,
            records_imported: start.records_imported,
            errors: start.errors,
            status: CheckpointStatus::Running,
            error_message: None,
        })
    }

    /// Persist counters for a running checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if the checkpoint does not exist, or
    /// `DatabaseError::InvalidState` if it is no longer running.
    pub async fn record_progress(
        &self,
        id: &str,
        counters: CheckpointCounters,
    ) -> Result<(), DatabaseError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE import_checkpoints
                 SET records_processed = ?1, records_imported = ?2, errors = ?3
                 WHERE id = ?4 AND status = 'running'",
                libsql::params![
                    count_param(counters.records_processed),
                    count_param(counters.records_imported),
                    count_param(counters.errors),
                    id
                ],
            )
            .await?;
        if updated == 0 {
            let current = self.get_checkpoint(id).await?;
            return Err(DatabaseError::InvalidState(format!(
                "Cannot record progress on checkpoint {id} in status {}",
                current.status
            )));
        }
        Ok(())
    }

    /// Move a running checkpoint to `status` with its final counters.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the checkpoint has already
    /// been finalized, or `DatabaseError::NoResult` if it does not exist.
    pub async fn finalize_checkpoint(
        &self,
        id: &str,
        status: CheckpointStatus,
        counters: CheckpointCounters,
        error_message: Option<&str>,
    ) -> Result<ImportCheckpoint, DatabaseError> {
        let current = self.get_checkpoint(id).await?;
        if !current.status.can_transition_to(status) {
            return Err(DatabaseError::InvalidState(format!(
                "Cannot transition checkpoint {id} from {} to {status}",
                current.status
            )));
        }

        let now = Utc::now();
        let updated = self
            .conn()
            .execute(
                "UPDATE import_checkpoints
                 SET status = ?1, completed_at = ?2, records_processed = ?3,
                     records_imported = ?4, errors = ?5, error_message = ?6
                 WHERE id = ?7 AND status = 'running'",
                libsql::params![
                    status.as_str(),
                    format_datetime(&now),
                    count_param(counters.records_processed),
                    count_param(counters.records_imported),
                    count_param(counters.errors),
                    error_message,
                    id
                ],
            )
            .await?;
        if updated == 0 {
            return Err(DatabaseError::InvalidState(format!(
                "Checkpoint {id} was finalized concurrently"
            )));
        }

        tracing::debug!(checkpoint_id = id, %status, ?counters, "checkpoint finalized");
        self.get_checkpoint(id).await
    }

    /// Get a checkpoint by ID.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if the checkpoint does not exist.
    pub async fn get_checkpoint(&self, id: &str) -> Result<ImportCheckpoint, DatabaseError> {
        let mut rows = self
            .conn()
            .query(&format!("{SELECT_CHECKPOINT} WHERE id = ?1"), [id])
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_checkpoint(&row)
    }

    /// Most recent checkpoint for `source_id`, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn latest_checkpoint(
        &self,
        source_id: &str,
    ) -> Result<Option<ImportCheckpoint>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "{SELECT_CHECKPOINT} WHERE source_id = ?1
                     ORDER BY started_at DESC, rowid DESC LIMIT 1"
                ),
                [source_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_checkpoint(&row)?)),
            None => Ok(None),
        }
    }

    /// The latest checkpoint for `source_id` if a resume may continue from it.
    ///
    /// Only the latest row counts: once a run completes, older paused or
    /// failed rows are history.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn resumable_checkpoint(
        &self,
        source_id: &str,
    ) -> Result<Option<ImportCheckpoint>, DatabaseError> {
        Ok(self
            .latest_checkpoint(source_id)
            .await?
            .filter(ImportCheckpoint::is_resumable))
    }

    /// Checkpoints newest first, optionally for one source.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_checkpoints(
        &self,
        source_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ImportCheckpoint>, DatabaseError> {
        let mut rows = match source_id {
            Some(source_id) => {
                self.reader()
                    .query(
                        &format!(
                            "{SELECT_CHECKPOINT} WHERE source_id = ?1
                             ORDER BY started_at DESC, rowid DESC LIMIT ?2"
                        ),
                        libsql::params![source_id, i64::from(limit)],
                    )
                    .await?
            }
            None => {
                self.reader()
                    .query(
                        &format!(
                            "{SELECT_CHECKPOINT} ORDER BY started_at DESC, rowid DESC LIMIT ?1"
                        ),
                        [i64::from(limit)],
                    )
                    .await?
            }
        };

        let mut checkpoints = Vec::new();
        while let Some(row) = rows.next().await? {
            checkpoints.push(row_to_checkpoint(&row)?);
        }
        Ok(checkpoints)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count_checkpoints(&self) -> Result<u64, DatabaseError> {
        self.count_rows("SELECT COUNT(*) FROM import_checkpoints").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn test_store() -> Store {
        Store::open_in_memory().await.unwrap()
    }

    fn counters(processed: u64, imported: u64, errors: u64) -> CheckpointCounters {
        CheckpointCounters {
            records_processed: processed,
            records_imported: imported,
            errors,
        }
    }

    #[tokio::test]
    async fn create_and_get_checkpoint() {
        let store = test_store().await;
        let created = store
            .create_checkpoint("a.jsonl", counters(10, 8, 2))
            .await
            .unwrap();
        assert!(created.id.starts_with("imp-"));

        let fetched = store.get_checkpoint(&created.id).await.unwrap();
        assert_eq!(fetched.source_id, "a.jsonl");
        assert_eq!(fetched.status, CheckpointStatus::Running);
        assert_eq!(fetched.counters(), counters(10, 8, 2));
        assert!(fetched.completed_at.is_none());
    }

    #[tokio::test]
    async fn record_progress_updates_counters() {
        let store = test_store().await;
        let cp = store
            .create_checkpoint("a.jsonl", CheckpointCounters::default())
            .await
            .unwrap();
        store.record_progress(&cp.id, counters(100, 97, 3)).await.unwrap();
        let fetched = store.get_checkpoint(&cp.id).await.unwrap();
        assert_eq!(fetched.counters(), counters(100, 97, 3));
    }

    #[tokio::test]
    async fn record_progress_on_missing_checkpoint() {
        let store = test_store().await;
        let err = store
            .record_progress("imp-00000000", CheckpointCounters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NoResult));
    }

    #[tokio::test]
    async fn get_nonexistent_checkpoint() {
        let store = test_store().await;
        let err = store.get_checkpoint("imp-ffffffff").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NoResult));
    }

    #[tokio::test]
    async fn resumable_checkpoint_ignores_completed() {
        let store = test_store().await;
        let cp = store
            .create_checkpoint("a.jsonl", CheckpointCounters::default())
            .await
            .unwrap();
        assert!(store.resumable_checkpoint("a.jsonl").await.unwrap().is_some());

        store
            .finalize_checkpoint(&cp.id, CheckpointStatus::Completed, counters(5, 5, 0), None)
            .await
            .unwrap();
        assert!(store.resumable_checkpoint("a.jsonl").await.unwrap().is_none());
        assert!(store.resumable_checkpoint("other.jsonl").await.unwrap().is_none());
    }
}
