//! Error types for Replica core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Local storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] replica_store::StoreError),

    /// Record or schema inconsistency.
    #[error("model error: {0}")]
    Model(#[from] replica_model::ModelError),

    /// Unexpected duplicate or inconsistent row state.
    #[error("conflict on record `{id}` of entity type `{entity_type}`")]
    Conflict {
        /// Entity type of the conflicting record.
        entity_type: String,
        /// The conflicting record ID.
        id: String,
    },

    /// The declared belongs-to references form a cycle.
    ///
    /// A configuration defect: fatal at startup, never recoverable at
    /// runtime.
    #[error("dependency cycle involving entity type `{entity_type}`")]
    Cycle {
        /// One member of the detected cycle.
        entity_type: String,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a conflict error.
    pub fn conflict(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Conflict {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
