//! ID prefixes for generated identifiers.
//!
//! Generated IDs have the form `{prefix}-{8 hex chars}`, e.g. `imp-a3f8b2c1`.
//! Inspection identifiers are never generated; they come from the source.

/// Import checkpoint rows.
pub const PREFIX_CHECKPOINT: &str = "imp";

/// Every prefix the store is allowed to mint.
pub const ALL_PREFIXES: &[&str] = &[PREFIX_CHECKPOINT];
