//! # conduit-core
//!
//! Core types, ID prefixes, and error types for Conduit.
//!
//! This crate provides the foundational types shared across all Conduit crates:
//! - Entity structs for inspections, defects, and import checkpoints
//! - The raw wire shape of a source line and its validation into a typed record
//! - The search filter and its in-memory predicate
//! - Checkpoint status enum with its state machine
//! - Import progress snapshots and search/summary response types
//! - Per-record error types (parse, validation)

pub mod entities;
pub mod enums;
pub mod errors;
pub mod filter;
pub mod ids;
pub mod progress;
pub mod raw;
pub mod responses;
