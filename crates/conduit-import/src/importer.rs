//! The chunk/batch import loop.
//!
//! One run per source: resolve the starting offset, open a checkpoint, then
//! decode fixed-size chunks at the current offset and write them in batches.
//! Every batch is validated, deduplicated, written in one transaction and
//! followed by a checkpoint update, so a crash re-does at most one batch.
//!
//! Offsets are ordinals of non-blank source lines. A batch covers a contiguous
//! ordinal range, malformed lines included, so `records_processed` after a
//! batch is always `last ordinal + 1`.

use std::collections::HashSet;
use std::sync::Arc;

use conduit_core::entities::{CheckpointCounters, ImportCheckpoint, InspectionRecord};
use conduit_core::enums::CheckpointStatus;
use conduit_core::progress::ImportProgress;
use conduit_core::raw::RawInspection;
use conduit_db::Store;
use conduit_source::{ByteSource, DecodeOptions, Decoded, Decoder};

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::observer::ProgressObserver;
use crate::report::ImportReport;
use crate::stop::StopSignal;

/// A contiguous run of decoded lines written as one transaction.
#[derive(Debug, Default)]
struct Batch {
    lines: Vec<Decoded<RawInspection>>,
    records: usize,
}

impl Batch {
    fn last_ordinal(&self) -> Option<u64> {
        self.lines.last().map(Decoded::ordinal)
    }
}

/// Split one chunk into contiguous batches of `batch_size` lines, malformed
/// lines included. A trailing run of malformed lines shorter than a batch
/// joins the last batch, which still holds at most `batch_size` records.
fn partition(chunk: Vec<Decoded<RawInspection>>, batch_size: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = Batch::default();
    for line in chunk {
        if matches!(line, Decoded::Record { .. }) {
            current.records += 1;
        }
        current.lines.push(line);
        if current.lines.len() == batch_size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.lines.is_empty() {
        match batches.last_mut() {
            Some(last) if current.records == 0 => last.lines.append(&mut current.lines),
            _ => batches.push(current),
        }
    }
    batches
}

/// Imports sources into a [`Store`] through a [`Decoder`].
pub struct Importer<S> {
    store: Arc<Store>,
    decoder: Decoder<S>,
    config: ImportConfig,
}

impl<S: ByteSource> Importer<S> {
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidConfig`] if `config` fails validation.
    pub fn new(store: Arc<Store>, source: S, config: ImportConfig) -> Result<Self, ImportError> {
        config.validate()?;
        Ok(Self {
            store,
            decoder: Decoder::new(source, config.decoder),
            config,
        })
    }

    pub const fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub const fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub const fn source(&self) -> &S {
        self.decoder.source()
    }

    /// Import one source.
    ///
    /// Returns the run's final progress. A run that fails after its checkpoint
    /// was opened is returned as `Ok` with status `failed` and the error
    /// message; its counters stay in the ledger for a later resume.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ResumeUnavailable`] when `resume` is set and the
    /// source has no resumable checkpoint, or [`ImportError::Database`] if the
    /// checkpoint for this run cannot be opened.
    pub async fn import_source(
        &self,
        source_id: &str,
        resume: bool,
        stop: &StopSignal,
        observer: &dyn ProgressObserver,
    ) -> Result<ImportProgress, ImportError> {
        let start = if resume {
            self.resume_point(source_id).await?
        } else {
            CheckpointCounters::default()
        };

        let checkpoint = self.store.create_checkpoint(source_id, start).await?;
        let mut progress =
            ImportProgress::running(source_id, &checkpoint.id, start, checkpoint.started_at);
        tracing::info!(
            source_id,
            checkpoint_id = %checkpoint.id,
            offset = start.records_processed,
            resume,
            "import started"
        );

        let (status, error_message) = match self.run_chunks(&mut progress, stop, observer).await {
            Ok(status) => (status, None),
            Err(e) => {
                tracing::warn!(source_id, error = %e, "import failed");
                (CheckpointStatus::Failed, Some(e.to_string()))
            }
        };

        let (status, error_message) = match self
            .store
            .finalize_checkpoint(
                &checkpoint.id,
                status,
                progress.counters(),
                error_message.as_deref(),
            )
            .await
        {
            Ok(_) => (status, error_message),
            Err(e) => {
                tracing::warn!(checkpoint_id = %checkpoint.id, error = %e, "checkpoint finalize failed");
                (
                    CheckpointStatus::Failed,
                    Some(format!("checkpoint finalize failed: {e}")),
                )
            }
        };
        progress.finish(status, error_message);

        tracing::info!(
            source_id,
            %status,
            processed = progress.records_processed,
            imported = progress.records_imported,
            errors = progress.errors,
            "import finished"
        );
        Ok(progress)
    }

    /// Import `sources` in order, stopping at the first source that fails or
    /// pauses.
    ///
    /// With `resume`, a source whose latest run completed is skipped and a
    /// source with no history starts fresh; only sources with an unfinished
    /// run continue from their checkpoint.
    pub async fn import_all(
        &self,
        sources: &[String],
        resume: bool,
        stop: &StopSignal,
        observer: &dyn ProgressObserver,
    ) -> ImportReport {
        let mut report = ImportReport::default();
        for source_id in sources {
            let resume_this = if resume {
                match self.store.latest_checkpoint(source_id).await {
                    Ok(Some(cp)) if !cp.is_resumable() => {
                        tracing::info!(source_id = %source_id, "already imported; skipping");
                        report.skipped.push(source_id.clone());
                        continue;
                    }
                    Ok(latest) => latest.is_some(),
                    Err(e) => {
                        report.abort(source_id, &ImportError::from(e));
                        break;
                    }
                }
            } else {
                false
            };

            match self.import_source(source_id, resume_this, stop, observer).await {
                Ok(progress) => {
                    let status = progress.status;
                    report.sources.push(progress);
                    if status != CheckpointStatus::Completed {
                        break;
                    }
                }
                Err(e) => {
                    report.abort(source_id, &e);
                    break;
                }
            }
        }
        report
    }

    /// Offset and carried-forward counters for a resumed run.
    ///
    /// A stale `running` checkpoint (a crashed run) is closed as `failed` so
    /// the ledger never holds two open runs for one source.
    async fn resume_point(&self, source_id: &str) -> Result<CheckpointCounters, ImportError> {
        let latest = self
            .store
            .latest_checkpoint(source_id)
            .await?
            .filter(ImportCheckpoint::is_resumable)
            .ok_or_else(|| ImportError::ResumeUnavailable {
                source_id: source_id.to_string(),
            })?;

        if latest.status == CheckpointStatus::Running {
            tracing::warn!(
                source_id,
                checkpoint_id = %latest.id,
                "closing interrupted run before resume"
            );
            self.store
                .finalize_checkpoint(
                    &latest.id,
                    CheckpointStatus::Failed,
                    latest.counters(),
                    Some("interrupted; superseded by resume"),
                )
                .await?;
        }
        Ok(latest.counters())
    }

    async fn run_chunks(
        &self,
        progress: &mut ImportProgress,
        stop: &StopSignal,
        observer: &dyn ProgressObserver,
    ) -> Result<CheckpointStatus, ImportError> {
        let batch_size = self.config.batch_size as usize;
        loop {
            if stop.is_stopped() {
                tracing::info!(source_id = %progress.source_id, "stop requested; pausing");
                return Ok(CheckpointStatus::Paused);
            }

            let chunk = self
                .read_chunk(&progress.source_id, progress.records_processed)
                .await?;
            if chunk.is_empty() {
                return Ok(CheckpointStatus::Completed);
            }

            for batch in partition(chunk, batch_size) {
                self.write_batch(batch, progress).await?;
                observer.on_batch(progress);
            }
        }
    }

    /// Decode up to `chunk_size` lines starting at `offset`. Malformed lines
    /// count toward the budget, so a run of them cannot grow a chunk.
    async fn read_chunk(
        &self,
        source_id: &str,
        offset: u64,
    ) -> Result<Vec<Decoded<RawInspection>>, ImportError> {
        let options = DecodeOptions::all()
            .with_skip(offset)
            .with_limit(u64::from(self.config.chunk_size));
        let mut stream = self.decoder.decode::<RawInspection>(source_id, options).await?;
        let budget = self.config.chunk_size as usize;
        let mut chunk = Vec::with_capacity(budget);
        while chunk.len() < budget {
            let Some(line) = stream.next().await? else {
                break;
            };
            chunk.push(line);
        }
        Ok(chunk)
    }

    /// Validate, deduplicate and write one batch, then checkpoint it.
    async fn write_batch(
        &self,
        batch: Batch,
        progress: &mut ImportProgress,
    ) -> Result<(), ImportError> {
        let Some(last_ordinal) = batch.last_ordinal() else {
            return Ok(());
        };
        let source_id = progress.source_id.clone();
        let mut errors = 0u64;
        let mut valid: Vec<InspectionRecord> = Vec::with_capacity(batch.records);

        for line in batch.lines {
            match line {
                Decoded::Malformed { error, .. } => {
                    tracing::warn!(source_id = %source_id, %error, "dropping malformed line");
                    errors += 1;
                }
                Decoded::Record { ordinal, value } => match value.validate() {
                    Ok(record) => valid.push(record),
                    Err(error) => {
                        tracing::warn!(source_id = %source_id, ordinal, %error, "dropping invalid record");
                        errors += 1;
                    }
                },
            }
        }

        let candidates = valid.len();
        if self.config.dedup && !valid.is_empty() {
            let ids: Vec<String> = valid.iter().map(|r| r.id.clone()).collect();
            let existing = self.store.existing_ids(&ids).await?;
            let mut seen = HashSet::with_capacity(valid.len());
            valid.retain(|r| !existing.contains(&r.id) && seen.insert(r.id.clone()));
        }
        let duplicates = candidates - valid.len();

        let written = match self.store.upsert_batch(&valid, &source_id).await {
            Ok(outcome) => {
                errors += outcome.failed.len() as u64;
                outcome.written
            }
            Err(e) => {
                tracing::warn!(source_id = %source_id, records = valid.len(), error = %e, "batch write failed");
                errors += valid.len() as u64;
                0
            }
        };

        let counters = CheckpointCounters {
            records_processed: last_ordinal + 1,
            records_imported: progress.records_imported + written,
            errors: progress.errors + errors,
        };
        self.store
            .record_progress(&progress.checkpoint_id, counters)
            .await?;
        progress.apply(counters);

        tracing::debug!(
            source_id = %source_id,
            processed = counters.records_processed,
            written,
            duplicates,
            errors,
            "batch checkpointed"
        );
        Ok(())
    }
}
