//! Progress observers, notified after every committed batch.

use conduit_core::progress::ImportProgress;
use tokio::sync::watch;

/// Receives a progress snapshot after each batch commit.
///
/// Called inline on the import task, so implementations must return quickly
/// and never block.
pub trait ProgressObserver: Send + Sync {
    fn on_batch(&self, progress: &ImportProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ImportProgress) + Send + Sync,
{
    fn on_batch(&self, progress: &ImportProgress) {
        self(progress);
    }
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_batch(&self, _progress: &ImportProgress) {}
}

/// Publishes snapshots into a latest-value channel. Receivers that fall behind
/// only ever see the newest snapshot.
#[derive(Debug, Clone)]
pub struct WatchObserver {
    tx: watch::Sender<Option<ImportProgress>>,
}

impl WatchObserver {
    #[must_use]
    pub const fn new(tx: watch::Sender<Option<ImportProgress>>) -> Self {
        Self { tx }
    }
}

impl ProgressObserver for WatchObserver {
    fn on_batch(&self, progress: &ImportProgress) {
        self.tx.send_replace(Some(progress.clone()));
    }
}
