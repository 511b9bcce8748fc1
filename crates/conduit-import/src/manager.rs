//! Import manager: one active run at a time, with stop/status/progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use conduit_core::progress::ImportProgress;
use conduit_source::ByteSource;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ImportError;
use crate::importer::Importer;
use crate::observer::{ProgressObserver, WatchObserver};
use crate::report::ImportReport;
use crate::stop::StopSignal;

/// Point-in-time view of a manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerStatus {
    pub running: bool,
    /// Latest progress snapshot of the active or most recent run.
    pub current: Option<ImportProgress>,
    /// Per-source results of the most recent finished run.
    pub finished: Vec<ImportProgress>,
}

struct Inner<S> {
    importer: Importer<S>,
    running: AtomicBool,
    stop: StopSignal,
    progress: watch::Sender<Option<ImportProgress>>,
    observer: Option<Box<dyn ProgressObserver>>,
    finished: Mutex<Vec<ImportProgress>>,
    task: Mutex<Option<JoinHandle<ImportReport>>>,
}

/// Clears the running flag when a run ends, however it ends.
struct RunGuard<S> {
    inner: Arc<Inner<S>>,
}

impl<S> RunGuard<S> {
    fn acquire(inner: &Arc<Inner<S>>) -> Result<Self, ImportError> {
        inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ImportError::Conflict)?;
        inner.stop.reset();
        Ok(Self {
            inner: Arc::clone(inner),
        })
    }
}

impl<S> Drop for RunGuard<S> {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }
}

/// Owns an [`Importer`] and serializes runs through it.
///
/// Cheap to clone; clones share state.
pub struct ImportManager<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for ImportManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ByteSource + 'static> ImportManager<S> {
    #[must_use]
    pub fn new(importer: Importer<S>) -> Self {
        Self::build(importer, None)
    }

    /// Like [`Self::new`], with `observer` also called after every batch,
    /// after the progress feed has been updated.
    #[must_use]
    pub fn with_observer(importer: Importer<S>, observer: impl ProgressObserver + 'static) -> Self {
        Self::build(importer, Some(Box::new(observer)))
    }

    fn build(importer: Importer<S>, observer: Option<Box<dyn ProgressObserver>>) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                importer,
                running: AtomicBool::new(false),
                stop: StopSignal::new(),
                progress,
                observer,
                finished: Mutex::new(Vec::new()),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn importer(&self) -> &Importer<S> {
        &self.inner.importer
    }

    /// Spawn a run over `sources` on the tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Conflict`] if a run is already active.
    pub fn start(&self, sources: Vec<String>, resume: bool) -> Result<(), ImportError> {
        let guard = RunGuard::acquire(&self.inner)?;
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            execute(&inner, &sources, resume).await
        });
        *self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Run over `sources` on the current task.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Conflict`] if a run is already active.
    pub async fn run(&self, sources: &[String], resume: bool) -> Result<ImportReport, ImportError> {
        let _guard = RunGuard::acquire(&self.inner)?;
        Ok(execute(&self.inner, sources, resume).await)
    }

    /// Ask the active run to pause at its next chunk boundary.
    ///
    /// Returns whether a run was active.
    pub fn stop(&self) -> bool {
        if self.is_running() {
            tracing::info!("stop requested");
            self.inner.stop.stop();
            true
        } else {
            false
        }
    }

    /// The shared stop signal, for wiring to Ctrl-C and the like.
    pub fn stop_signal(&self) -> StopSignal {
        self.inner.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ManagerStatus {
        ManagerStatus {
            running: self.is_running(),
            current: self.inner.progress.borrow().clone(),
            finished: self
                .inner
                .finished
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    /// Await the run started by [`Self::start`]. `None` if nothing was started
    /// or it was already awaited.
    pub async fn wait(&self) -> Option<Result<ImportReport, ImportError>> {
        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        Some(handle.await.map_err(|e| ImportError::Task(e.to_string())))
    }

    /// Latest-value progress feed.
    pub fn subscribe(&self) -> watch::Receiver<Option<ImportProgress>> {
        self.inner.progress.subscribe()
    }

    /// Whether a resume could continue `source_id` from the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Database`] if the ledger lookup fails.
    pub async fn is_resumable(&self, source_id: &str) -> Result<bool, ImportError> {
        Ok(self
            .inner
            .importer
            .store()
            .resumable_checkpoint(source_id)
            .await?
            .is_some())
    }
}

async fn execute<S: ByteSource>(inner: &Inner<S>, sources: &[String], resume: bool) -> ImportReport {
    inner
        .finished
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
    inner.progress.send_replace(None);

    let feed = WatchObserver::new(inner.progress.clone());
    let observer = |progress: &ImportProgress| {
        feed.on_batch(progress);
        if let Some(extra) = &inner.observer {
            extra.on_batch(progress);
        }
    };
    let report = inner
        .importer
        .import_all(sources, resume, &inner.stop, &observer)
        .await;

    if let Some(last) = report.sources.last() {
        inner.progress.send_replace(Some(last.clone()));
    }
    inner
        .finished
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone_from(&report.sources);
    tracing::info!(
        status = %report.status(),
        sources = report.sources.len(),
        imported = report.records_imported(),
        errors = report.errors(),
        "import run finished"
    );
    report
}
