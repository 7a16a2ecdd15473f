//! # Replica Sync
//!
//! Push/pull synchronization engine for Replica.
//!
//! This crate provides:
//! - The remote transport boundary (list/create/update/delete per
//!   entity type) with classified transport errors
//! - The session-provider seam consulted before any remote call
//! - Per-entity-type sync adapters (push-dirty, pull-all)
//! - The sync engine: push-then-pull passes in dependency order,
//!   throttled downloads, and destructive full reloads
//! - A single-threaded storage worker and completion handles with
//!   bounded blocking waits
//!
//! ## Architecture
//!
//! A sync pass runs **push then pull** across all registered entity
//! types, both phases in the same dependency order, so referenced
//! records exist on each side before the records that reference them.
//! A failure in a phase aborts the remaining adapters of that phase;
//! the pull phase only starts if the push phase fully succeeded.
//!
//! ## Key invariants
//!
//! - Two passes never run concurrently against the same local store
//! - Pending local edits always win over pulled server data until pushed
//! - The download watermark advances only after a pull with zero failures
//! - A failed pass leaves already-committed per-record work in place
//!   and everything else untouched

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod config;
mod engine;
mod error;
mod session;
mod transport;
mod worker;

pub use adapter::{PullOutcome, PushOutcome, SyncAdapter};
pub use config::SyncConfig;
pub use engine::{PassHandle, PassReport, SyncEngine, SyncEngineBuilder, SyncState};
pub use error::{SyncError, SyncResult};
pub use session::{MockSessionProvider, NullSessionProvider, SessionContext, SessionProvider};
pub use transport::{MockTransport, RemoteTransport, TransportError, TransportResult};
pub use worker::{CancelToken, Completion, StorageWorker};
