//! # Replica Core
//!
//! Local synchronization state for the Replica engine.
//!
//! This crate provides:
//! - [`DirtyStore`]: a per-entity-type controller over the local row
//!   store, tracking each record's dirty status and applying
//!   conflict-aware merges of incoming server data
//! - [`TombstoneLedger`]: locally deleted record IDs, consulted during
//!   pulls so the server cannot resurrect a deleted record
//! - [`DependencyGraph`]: a total order over entity types derived from
//!   declared belongs-to references
//!
//! ## Key invariants
//!
//! - Every persisted record has an ID and exactly one dirty status
//! - A dirty local row always wins over incoming server data until it
//!   has been pushed
//! - A tombstone exists exactly for records that were synced once and
//!   then deleted locally

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dirty;
mod error;
mod graph;
mod tombstone;

pub use dirty::DirtyStore;
pub use error::{CoreError, CoreResult};
pub use graph::DependencyGraph;
pub use tombstone::{TombstoneLedger, TOMBSTONE_TABLE};
