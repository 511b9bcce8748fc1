//! # conduit-import
//!
//! Resumable, idempotent batch import of line-delimited inspection sources
//! into the structured store.
//!
//! - [`Importer`]: the chunk/batch loop for one source, and sequential
//!   multi-source runs that stop at the first failed or paused source
//! - [`ImportManager`]: at most one active run, with stop, status, progress
//!   subscription and resume checks
//! - [`ImportConfig`]: chunk, batch, dedup and decoder sizing
//! - [`StopSignal`] / [`ProgressObserver`]: cooperative stop and per-batch
//!   progress callbacks

mod config;
mod error;
mod importer;
mod manager;
mod observer;
mod report;
mod stop;

pub use config::ImportConfig;
pub use error::ImportError;
pub use importer::Importer;
pub use manager::{ImportManager, ManagerStatus};
pub use observer::{NoopObserver, ProgressObserver, WatchObserver};
pub use report::{AbortedSource, ImportReport};
pub use stop::StopSignal;
