//! Records and their synchronization status.

use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque identifier for a record.
///
/// IDs are client-generated (UUID v4) when the caller does not supply
/// one, so records created offline never collide with server IDs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Millisecond Unix-epoch timestamp.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(millis as i64)
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed between `earlier` and this timestamp.
    #[must_use]
    pub const fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }
}

/// Synchronization status of a locally persisted record.
///
/// Lifecycle: a new record starts `Created`; a successful push moves it
/// to `Clean`; a local edit of a `Clean` record moves it to `Updated`;
/// a local edit of a `Created` record leaves it `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirtyStatus {
    /// The local row matches the server.
    Clean,
    /// The row exists only locally and has never been pushed.
    Created,
    /// The row exists on the server but carries unpushed local edits.
    Updated,
}

impl DirtyStatus {
    /// Returns true if the record carries unpushed local changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !matches!(self, DirtyStatus::Clean)
    }
}

/// An entity record: an opaque ID plus typed payload fields and
/// server-assigned timestamps.
///
/// The ID is `None` only for drafts that have not been inserted yet;
/// the local store assigns one on insert.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier, assigned on insert if absent.
    pub id: Option<RecordId>,
    /// Typed payload fields, keyed by schema field name.
    pub fields: BTreeMap<String, FieldValue>,
    /// Server-assigned creation time.
    pub created_at: Option<Timestamp>,
    /// Server-assigned last-update time.
    pub updated_at: Option<Timestamp>,
}

impl Record {
    /// Creates an empty draft record with no ID.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record with the given ID.
    pub fn with_id(id: impl Into<RecordId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Sets a payload field, replacing any previous value.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Sets a payload field on a record in place.
    pub fn put(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Looks up a payload field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// A record as persisted by the local store: payload plus dirty status.
///
/// Every persisted record has a non-null ID and exactly one dirty
/// status; the store controller upholds the ID half of that invariant
/// by assigning IDs before rows reach the row store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The record payload.
    pub record: Record,
    /// Synchronization status of the row.
    pub dirty: DirtyStatus,
}

impl StoredRecord {
    /// Creates a stored record.
    #[must_use]
    pub fn new(record: Record, dirty: DirtyStatus) -> Self {
        Self { record, dirty }
    }

    /// Returns true if the row carries unpushed local changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }
}
