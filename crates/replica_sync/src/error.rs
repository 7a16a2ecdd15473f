//! Error types for the sync engine.

use crate::transport::TransportError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local store or configuration error. Fatal for the current pass;
    /// the next pass retries from the persisted state.
    #[error("core error: {0}")]
    Core(#[from] replica_core::CoreError),

    /// Remote call failure. Never auto-retried within a pass; a later
    /// sync attempt retries.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session acquisition failed before any remote call was made.
    #[error("session acquisition failed: {0}")]
    Session(#[source] TransportError),

    /// One or more records failed to push for an entity type.
    ///
    /// The push attempted every dirty record of the type; `failed` of
    /// `attempted` did not make it, and `first` is the first failure.
    #[error("push incomplete for entity type `{entity_type}`: {failed} of {attempted} records failed")]
    Push {
        /// The entity type whose push was incomplete.
        entity_type: String,
        /// Number of dirty records attempted.
        attempted: usize,
        /// Number of records that failed.
        failed: usize,
        /// The first failure.
        #[source]
        first: Box<SyncError>,
    },

    /// A sync pass was requested while another is in flight.
    #[error("a sync pass is already running")]
    AlreadyRunning,

    /// The pass was cancelled before it completed.
    #[error("sync pass cancelled")]
    Cancelled,

    /// A bounded blocking wait elapsed before the pass completed.
    #[error("timed out waiting for sync pass")]
    Timeout,

    /// The storage worker thread is no longer accepting jobs.
    #[error("storage worker is gone")]
    WorkerGone,
}

impl SyncError {
    /// Returns true if the failure is scoped to a single record, so a
    /// push may continue with the remaining records of the type.
    ///
    /// Transport failures and row conflicts are record-scoped; local
    /// storage failures are fatal for the pass.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_) | SyncError::Core(replica_core::CoreError::Conflict { .. })
        )
    }
}
