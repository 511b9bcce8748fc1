//! Repository modules for the structured store.
//!
//! Each module adds methods to `Store` via `impl Store` blocks.

pub mod inspections;
pub mod ledger;
pub mod summary;
