//! # conduit-search
//!
//! Filtered, paginated search over inspection records.
//!
//! Two interchangeable backends implement [`SearchBackend`]:
//! - [`IndexedBackend`]: one count query plus one ordered page read against
//!   the store. Totals are exact.
//! - [`StreamingBackend`]: an in-order scan of the remote sources that stops
//!   as soon as the page is full. Totals are sampled estimates unless every
//!   source was read to the end.
//!
//! [`SearchEngine`] picks between them per [`BackendChoice`]. Both apply the
//! same filter semantics (`SearchFilter::matches` mirrors the store's SQL).

pub mod backend;
pub mod engine;
pub mod error;
pub mod indexed;
pub mod streaming;

pub use backend::SearchBackend;
pub use engine::{BackendChoice, SearchEngine};
pub use error::SearchError;
pub use indexed::IndexedBackend;
pub use streaming::{ScanOptions, StreamingBackend};
