//! Error types for the data model.

use crate::value::FieldKind;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when records or schemas are inconsistent.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A payload field is not declared by the schema.
    #[error("unknown field `{field}` for entity type `{entity_type}`")]
    UnknownField {
        /// Entity type whose schema was consulted.
        entity_type: String,
        /// Offending field name.
        field: String,
    },

    /// A payload value does not match the declared field kind.
    #[error("field `{field}` of entity type `{entity_type}` expects {expected}")]
    KindMismatch {
        /// Entity type whose schema was consulted.
        entity_type: String,
        /// Offending field name.
        field: String,
        /// The declared kind.
        expected: FieldKind,
    },

    /// Schema composition produced two fields with the same name.
    #[error("duplicate field `{field}` in schema for entity type `{entity_type}`")]
    DuplicateField {
        /// Entity type whose schema is inconsistent.
        entity_type: String,
        /// The duplicated field name.
        field: String,
    },

    /// A record that must carry an ID does not.
    #[error("record for entity type `{entity_type}` has no id")]
    MissingId {
        /// Entity type of the offending record.
        entity_type: String,
    },
}
