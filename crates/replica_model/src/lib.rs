//! # Replica Model
//!
//! Data model for the Replica synchronization engine.
//!
//! This crate provides:
//! - Tagged field values with declared kinds
//! - Statically declared entity schemas (field-to-column mapping,
//!   belongs-to references, embedded-schema composition)
//! - Record payloads with server-assigned timestamps
//! - The per-record dirty status tracked by the local store

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod record;
mod schema;
mod value;

pub use error::{ModelError, ModelResult};
pub use record::{DirtyStatus, Record, RecordId, StoredRecord, Timestamp};
pub use schema::{EntitySchema, EntityType, FieldDef};
pub use value::{FieldKind, FieldValue};
