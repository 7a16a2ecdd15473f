//! Error types for local storage backends.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in a local storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert hit an existing row with the same ID.
    #[error("duplicate row `{id}` in table `{table}`")]
    DuplicateRow {
        /// Table the insert targeted.
        table: String,
        /// The conflicting row ID.
        id: String,
    },

    /// An update targeted a row that does not exist.
    #[error("missing row `{id}` in table `{table}`")]
    MissingRow {
        /// Table the update targeted.
        table: String,
        /// The absent row ID.
        id: String,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backend is in a state it cannot recover from.
    #[error("storage backend failure: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a backend failure error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
