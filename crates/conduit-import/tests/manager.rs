//! Integration tests for the single-run import manager.

use std::sync::{Arc, OnceLock};

use conduit_core::enums::CheckpointStatus;
use conduit_core::progress::ImportProgress;
use conduit_db::Store;
use conduit_import::{ImportConfig, ImportError, ImportManager, Importer, StopSignal};
use conduit_source::MemorySource;
use pretty_assertions::assert_eq;

fn source_of(n: usize) -> String {
    (0..n)
        .map(|i| {
            serde_json::json!({
                "id": format!("INS-{i:04}"),
                "location": {"city": "Houston", "state": "TX"},
                "pipe": {"material": "PVC"},
                "inspection_score": 75.0,
                "requires_repair": false,
            })
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn config() -> ImportConfig {
    ImportConfig {
        chunk_size: 10,
        batch_size: 5,
        ..ImportConfig::default()
    }
}

async fn manager(records: usize) -> ImportManager<MemorySource> {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let source = MemorySource::new().with_source("s.jsonl", source_of(records));
    ImportManager::new(Importer::new(store, source, config()).unwrap())
}

#[tokio::test]
async fn stop_mid_run_pauses_and_leaves_source_resumable() {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let source = MemorySource::new().with_source("s.jsonl", source_of(50));
    let importer = Importer::new(store, source, config()).unwrap();

    let stop = Arc::new(OnceLock::<StopSignal>::new());
    let trigger = Arc::clone(&stop);
    let stop_after_first_batch = move |p: &ImportProgress| {
        if p.records_processed == 5
            && let Some(signal) = trigger.get()
        {
            signal.stop();
        }
    };
    let manager = ImportManager::with_observer(importer, stop_after_first_batch);
    stop.set(manager.stop_signal()).unwrap();

    manager.start(vec!["s.jsonl".into()], false).unwrap();
    let report = manager.wait().await.unwrap().unwrap();
    assert_eq!(report.status(), CheckpointStatus::Paused);
    let progress = report.source("s.jsonl").unwrap();
    assert_eq!(progress.status, CheckpointStatus::Paused);
    // The stop lands mid-chunk, so the chunk's second batch still commits.
    assert_eq!(progress.records_processed, 10);
    assert_eq!(progress.records_imported, 10);
    assert!(progress.resumable);
    assert!(manager.is_resumable("s.jsonl").await.unwrap());
    assert!(!manager.is_running());

    let resumed = manager.run(&["s.jsonl".to_string()], true).await.unwrap();
    assert_eq!(resumed.status(), CheckpointStatus::Completed);
    assert_eq!(resumed.records_imported(), 50);
    assert_eq!(manager.importer().store().count_inspections().await.unwrap(), 50);
    assert!(!manager.is_resumable("s.jsonl").await.unwrap());
}

#[tokio::test]
async fn second_start_while_running_conflicts() {
    let manager = manager(20).await;
    manager.start(vec!["s.jsonl".into()], false).unwrap();

    let again = manager.start(vec!["s.jsonl".into()], false).unwrap_err();
    assert!(matches!(again, ImportError::Conflict));
    let inline = manager.run(&["s.jsonl".to_string()], false).await.unwrap_err();
    assert!(matches!(inline, ImportError::Conflict));

    let report = manager.wait().await.unwrap().unwrap();
    assert_eq!(report.records_imported(), 20);
    assert!(manager.wait().await.is_none());

    // The guard is released once the run ends.
    manager.run(&["s.jsonl".to_string()], false).await.unwrap();
}

#[tokio::test]
async fn stop_when_idle_is_a_no_op() {
    let manager = manager(5).await;
    assert!(!manager.stop());
    assert!(!manager.stop_signal().is_stopped());
    let report = manager.run(&["s.jsonl".to_string()], false).await.unwrap();
    assert_eq!(report.status(), CheckpointStatus::Completed);
}

#[tokio::test]
async fn status_and_subscription_track_the_latest_run() {
    let manager = manager(12).await;
    let rx = manager.subscribe();
    assert!(rx.borrow().is_none());

    manager.run(&["s.jsonl".to_string()], false).await.unwrap();

    let latest = rx.borrow().clone().unwrap();
    assert_eq!(latest.status, CheckpointStatus::Completed);
    assert_eq!(latest.records_imported, 12);

    let status = manager.status();
    assert!(!status.running);
    assert_eq!(status.current, Some(latest));
    assert_eq!(status.finished.len(), 1);
}
