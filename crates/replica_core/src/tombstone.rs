//! Tombstones for locally deleted records.

use crate::error::CoreResult;
use replica_model::{DirtyStatus, EntityType, Record, RecordId, StoredRecord, Timestamp};
use replica_store::{RowStore, StoreError};
use std::sync::Arc;

/// Reserved table holding tombstones for every entity type.
pub const TOMBSTONE_TABLE: &str = "deleted_entries";

/// Append/lookup ledger of locally deleted record IDs.
///
/// A tombstone is written when a previously synced record is deleted
/// locally, and consulted during pulls so the server copy is not
/// resurrected. [`TombstoneLedger::clear`] is the hook for the moment
/// a deletion is confirmed to have propagated server-side; nothing in
/// this crate calls it yet.
///
/// Tombstones for all entity types share one reserved table, keyed by
/// `type:id`. Only existence checks are needed; no ordering is
/// guaranteed.
pub struct TombstoneLedger {
    store: Arc<dyn RowStore>,
}

impl TombstoneLedger {
    /// Creates a ledger over the given row store.
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    fn key(entity_type: EntityType, id: &RecordId) -> RecordId {
        RecordId::new(format!("{}:{}", entity_type.as_str(), id.as_str()))
    }

    /// Records that `id` of `entity_type` was deleted locally.
    ///
    /// Idempotent: marking an already-deleted record keeps the
    /// original tombstone.
    pub fn mark_deleted(&self, entity_type: EntityType, id: &RecordId) -> CoreResult<()> {
        let key = Self::key(entity_type, id);
        let record = Record::with_id(key.clone())
            .set("entity_type", entity_type.as_str())
            .set("record_id", id.as_str())
            .set("deleted_at", Timestamp::now().as_millis());
        match self
            .store
            .insert(TOMBSTONE_TABLE, &key, StoredRecord::new(record, DirtyStatus::Clean))
        {
            Err(StoreError::DuplicateRow { .. }) => Ok(()),
            other => Ok(other?),
        }
    }

    /// Checks whether `id` of `entity_type` was deleted locally.
    pub fn is_deleted(&self, entity_type: EntityType, id: &RecordId) -> CoreResult<bool> {
        let key = Self::key(entity_type, id);
        Ok(self.store.get(TOMBSTONE_TABLE, &key)?.is_some())
    }

    /// Drops the tombstone for `id` of `entity_type`.
    ///
    /// Called once the deletion has been confirmed pushed.
    pub fn clear(&self, entity_type: EntityType, id: &RecordId) -> CoreResult<()> {
        let key = Self::key(entity_type, id);
        self.store.delete(TOMBSTONE_TABLE, &key)?;
        Ok(())
    }

    /// Drops every tombstone, for destructive reloads.
    pub fn clear_all(&self) -> CoreResult<()> {
        Ok(self.store.clear_table(TOMBSTONE_TABLE)?)
    }
}
