//! Per-entity-type store controller with dirty-state tracking.

use crate::error::{CoreError, CoreResult};
use crate::tombstone::TombstoneLedger;
use replica_model::{
    DirtyStatus, EntitySchema, EntityType, FieldValue, ModelError, Record, RecordId, StoredRecord,
    Timestamp,
};
use replica_store::RowStore;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Controller for one entity type's rows in the local store.
///
/// Every mutation keeps the record's dirty status consistent with the
/// lifecycle: inserts start `Created`, edits of pushed rows become
/// `Updated`, and a confirmed push marks the row `Clean` again.
/// Incoming server data goes through [`DirtyStore::apply_server_record`],
/// which lets pending local edits win until they are pushed.
pub struct DirtyStore {
    schema: Arc<EntitySchema>,
    store: Arc<dyn RowStore>,
    tombstones: Arc<TombstoneLedger>,
}

impl DirtyStore {
    /// Creates a controller for the schema's entity type.
    pub fn new(
        schema: Arc<EntitySchema>,
        store: Arc<dyn RowStore>,
        tombstones: Arc<TombstoneLedger>,
    ) -> Self {
        Self {
            schema,
            store,
            tombstones,
        }
    }

    /// The schema this controller enforces.
    #[must_use]
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// The entity type this controller manages.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.schema.entity_type()
    }

    fn table(&self) -> &str {
        self.schema.table()
    }

    /// Point lookup by record ID.
    pub fn get(&self, id: &RecordId) -> CoreResult<Option<Record>> {
        Ok(self.store.get(self.table(), id)?.map(|row| row.record))
    }

    /// The dirty status of a row, if it exists.
    pub fn status(&self, id: &RecordId) -> CoreResult<Option<DirtyStatus>> {
        Ok(self.store.get(self.table(), id)?.map(|row| row.dirty))
    }

    /// Checks whether a row exists.
    pub fn exists(&self, id: &RecordId) -> CoreResult<bool> {
        Ok(self.store.get(self.table(), id)?.is_some())
    }

    /// Number of rows for this entity type.
    pub fn count(&self) -> CoreResult<usize> {
        Ok(self.store.count(self.table())?)
    }

    /// Lists records matching a predicate, ordered by the schema's
    /// default order field (ties and unordered schemas fall back to
    /// ID order).
    pub fn query(&self, predicate: impl Fn(&Record) -> bool) -> CoreResult<Vec<Record>> {
        self.query_ordered(predicate, None)
    }

    /// Lists records matching a predicate with an explicit ordering
    /// field; `None` falls back to the schema's default order.
    pub fn query_ordered(
        &self,
        predicate: impl Fn(&Record) -> bool,
        order: Option<&str>,
    ) -> CoreResult<Vec<Record>> {
        let rows = self
            .store
            .select(self.table(), &|row| predicate(&row.record))?;
        let mut records: Vec<Record> = rows.into_iter().map(|row| row.record).collect();
        let order_field = order.or_else(|| self.schema.default_order());
        records.sort_by(|a, b| record_ordering(a, b, order_field));
        Ok(records)
    }

    /// Lists every record for this entity type.
    pub fn list(&self) -> CoreResult<Vec<Record>> {
        self.query(|_| true)
    }

    /// Lists records carrying the given dirty status, in ID order.
    pub fn list_dirty(&self, status: DirtyStatus) -> CoreResult<Vec<Record>> {
        let rows = self.store.select(self.table(), &|row| row.dirty == status)?;
        Ok(rows.into_iter().map(|row| row.record).collect())
    }

    /// Inserts a record as locally created.
    ///
    /// Assigns a random unique ID when the record has none, stamps
    /// both timestamps, and stores the row as `Created`. Returns the
    /// stored record. Fails with a conflict error if the ID already
    /// exists.
    pub fn insert(&self, mut record: Record) -> CoreResult<Record> {
        self.schema.validate(&record)?;
        let id = record.id.take().unwrap_or_else(RecordId::generate);
        record.id = Some(id.clone());
        if self.store.get(self.table(), &id)?.is_some() {
            return Err(CoreError::conflict(
                self.entity_type().as_str(),
                id.as_str(),
            ));
        }
        let now = Timestamp::now();
        record.created_at = Some(now);
        record.updated_at = Some(now);
        self.store.insert(
            self.table(),
            &id,
            StoredRecord::new(record.clone(), DirtyStatus::Created),
        )?;
        Ok(record)
    }

    /// Applies a local edit to an existing record.
    ///
    /// A `Created` row stays `Created` (it has never been pushed);
    /// anything else becomes `Updated`. `updated_at` is refreshed,
    /// `created_at` is preserved.
    pub fn update(&self, mut record: Record) -> CoreResult<Record> {
        self.schema.validate(&record)?;
        let id = record.id.clone().ok_or_else(|| ModelError::MissingId {
            entity_type: self.entity_type().as_str().to_string(),
        })?;
        let current = self.store.get(self.table(), &id)?.ok_or_else(|| {
            CoreError::invalid_operation(format!(
                "update of missing record `{id}` of entity type `{}`",
                self.entity_type()
            ))
        })?;
        let dirty = match current.dirty {
            DirtyStatus::Created => DirtyStatus::Created,
            _ => DirtyStatus::Updated,
        };
        record.created_at = current.record.created_at;
        record.updated_at = Some(Timestamp::now());
        self.store
            .update(self.table(), &id, StoredRecord::new(record.clone(), dirty))?;
        Ok(record)
    }

    /// Deletes a record locally.
    ///
    /// A `Created` row was never pushed, so it is removed outright; any
    /// other row leaves a tombstone so a later pull cannot resurrect
    /// it. Deleting an absent row is a no-op.
    pub fn delete(&self, id: &RecordId) -> CoreResult<()> {
        let Some(row) = self.store.get(self.table(), id)? else {
            return Ok(());
        };
        self.store.delete(self.table(), id)?;
        if row.dirty != DirtyStatus::Created {
            self.tombstones.mark_deleted(self.entity_type(), id)?;
        }
        Ok(())
    }

    /// Marks a row as matching the server after a confirmed push.
    ///
    /// Only the dirty status changes; the payload and timestamps stay
    /// untouched.
    pub fn mark_clean(&self, id: &RecordId) -> CoreResult<()> {
        let mut row = self.store.get(self.table(), id)?.ok_or_else(|| {
            CoreError::invalid_operation(format!(
                "mark_clean of missing record `{id}` of entity type `{}`",
                self.entity_type()
            ))
        })?;
        row.dirty = DirtyStatus::Clean;
        self.store.update(self.table(), id, row)?;
        Ok(())
    }

    /// Merges one record of a server snapshot into the local store.
    ///
    /// - No local row: insert as `Clean`, unless a tombstone marks the
    ///   ID as locally deleted, in which case the record is discarded.
    /// - Local row is `Clean`: the server is authoritative; payload
    ///   and timestamps are overwritten, the row stays `Clean`.
    /// - Local row is `Created` or `Updated`: the incoming record is
    ///   discarded. Pending local edits win until they are pushed;
    ///   a server-side edit of the same record is silently lost here.
    pub fn apply_server_record(&self, incoming: Record) -> CoreResult<()> {
        self.schema.validate(&incoming)?;
        let id = incoming.id.clone().ok_or_else(|| ModelError::MissingId {
            entity_type: self.entity_type().as_str().to_string(),
        })?;
        match self.store.get(self.table(), &id)? {
            None => {
                if self.tombstones.is_deleted(self.entity_type(), &id)? {
                    debug!(
                        entity_type = %self.entity_type(),
                        id = %id,
                        "discarding pulled record deleted locally"
                    );
                    return Ok(());
                }
                let record = with_default_timestamps(incoming, None);
                self.store.insert(
                    self.table(),
                    &id,
                    StoredRecord::new(record, DirtyStatus::Clean),
                )?;
            }
            Some(existing) if existing.dirty == DirtyStatus::Clean => {
                let record = with_default_timestamps(incoming, existing.record.created_at);
                self.store.update(
                    self.table(),
                    &id,
                    StoredRecord::new(record, DirtyStatus::Clean),
                )?;
            }
            Some(_) => {
                debug!(
                    entity_type = %self.entity_type(),
                    id = %id,
                    "discarding pulled record: local row has pending edits"
                );
            }
        }
        Ok(())
    }

    /// Removes `Clean` rows absent from a full snapshot.
    ///
    /// Run once after every record of a pull batch has been applied;
    /// a `Clean` row the server no longer returns was deleted
    /// server-side. Dirty rows are kept until pushed. Returns the
    /// number of rows removed.
    pub fn sweep_absent(&self, seen: &HashSet<RecordId>) -> CoreResult<usize> {
        let stale = self.store.select(self.table(), &|row| {
            row.dirty == DirtyStatus::Clean
                && row
                    .record
                    .id
                    .as_ref()
                    .map(|id| !seen.contains(id))
                    .unwrap_or(false)
        })?;
        for row in &stale {
            if let Some(id) = &row.record.id {
                self.store.delete(self.table(), id)?;
            }
        }
        if !stale.is_empty() {
            debug!(
                entity_type = %self.entity_type(),
                removed = stale.len(),
                "swept rows deleted server-side"
            );
        }
        Ok(stale.len())
    }

    /// Removes every row for this entity type.
    ///
    /// Destructive; used by full reloads. Tombstones are cleared
    /// separately through the ledger.
    pub fn clear(&self) -> CoreResult<()> {
        Ok(self.store.clear_table(self.table())?)
    }
}

fn with_default_timestamps(mut record: Record, created_fallback: Option<Timestamp>) -> Record {
    let now = Timestamp::now();
    record.created_at = record.created_at.or(created_fallback).or(Some(now));
    record.updated_at = record.updated_at.or(Some(now));
    record
}

fn record_ordering(a: &Record, b: &Record, order_field: Option<&str>) -> Ordering {
    if let Some(field) = order_field {
        let ord = compare_fields(a.field(field), b.field(field));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.id.cmp(&b.id)
}

fn compare_fields(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    use FieldValue::{Bool, Bytes, Double, Int, Text};
    match (a, b) {
        (Bool(x), Bool(y)) => x.cmp(y),
        (Int(x), Int(y)) => x.cmp(y),
        (Double(x), Double(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Text(x), Text(y)) => x.cmp(y),
        (Bytes(x), Bytes(y)) => x.cmp(y),
        _ => variant_rank(a).cmp(&variant_rank(b)),
    }
}

fn variant_rank(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Null => 0,
        FieldValue::Bool(_) => 1,
        FieldValue::Int(_) => 2,
        FieldValue::Double(_) => 3,
        FieldValue::Text(_) => 4,
        FieldValue::Bytes(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_model::FieldKind;
    use replica_store::MemoryRowStore;

    fn task_schema() -> Arc<EntitySchema> {
        Arc::new(
            EntitySchema::new(EntityType::new("task"))
                .with_field("title", FieldKind::Text)
                .with_field("position", FieldKind::Int)
                .with_default_order("position"),
        )
    }

    fn store() -> DirtyStore {
        let rows: Arc<dyn RowStore> = Arc::new(MemoryRowStore::new());
        let tombstones = Arc::new(TombstoneLedger::new(Arc::clone(&rows)));
        DirtyStore::new(task_schema(), rows, tombstones)
    }

    fn server_record(id: &str, title: &str) -> Record {
        Record::with_id(id).set("title", title)
    }

    #[test]
    fn insert_assigns_id_and_created_status() {
        let store = store();
        let record = store.insert(Record::new().set("title", "x")).unwrap();

        let id = record.id.clone().unwrap();
        assert!(!id.as_str().is_empty());
        assert!(record.created_at.is_some());
        assert!(record.updated_at.is_some());
        assert_eq!(store.status(&id).unwrap(), Some(DirtyStatus::Created));

        let read_back = store.get(&id).unwrap().unwrap();
        assert_eq!(read_back.field("title").and_then(|v| v.as_text()), Some("x"));
    }

    #[test]
    fn insert_keeps_caller_id() {
        let store = store();
        let record = store.insert(server_record("t1", "x")).unwrap();
        assert_eq!(record.id, Some(RecordId::new("t1")));
    }

    #[test]
    fn insert_duplicate_id_conflicts() {
        let store = store();
        store.insert(server_record("t1", "x")).unwrap();
        let err = store.insert(server_record("t1", "y")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
    }

    #[test]
    fn insert_rejects_unknown_field() {
        let store = store();
        let err = store.insert(Record::new().set("priority", 1i64)).unwrap_err();
        assert!(matches!(err, CoreError::Model(_)));
    }

    #[test]
    fn edit_of_clean_row_becomes_updated() {
        let store = store();
        let record = store.insert(server_record("t1", "x")).unwrap();
        let id = record.id.clone().unwrap();
        store.mark_clean(&id).unwrap();

        store.update(record.set("title", "y")).unwrap();
        assert_eq!(store.status(&id).unwrap(), Some(DirtyStatus::Updated));
    }

    #[test]
    fn edit_of_created_row_stays_created() {
        let store = store();
        let record = store.insert(server_record("t1", "x")).unwrap();
        let id = record.id.clone().unwrap();

        store.update(record.set("title", "y")).unwrap();
        assert_eq!(store.status(&id).unwrap(), Some(DirtyStatus::Created));
    }

    #[test]
    fn update_preserves_created_at_and_refreshes_updated_at() {
        let store = store();
        let mut record = store.insert(server_record("t1", "x")).unwrap();
        let created = record.created_at;

        record.created_at = None;
        record.updated_at = None;
        let updated = store.update(record.set("title", "y")).unwrap();
        assert_eq!(updated.created_at, created);
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn update_of_missing_row_fails() {
        let store = store();
        let err = store.update(server_record("absent", "x")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
    }

    #[test]
    fn mark_clean_only_touches_status() {
        let store = store();
        let record = store.insert(server_record("t1", "x")).unwrap();
        let id = record.id.clone().unwrap();

        store.mark_clean(&id).unwrap();
        assert_eq!(store.status(&id).unwrap(), Some(DirtyStatus::Clean));
        let read_back = store.get(&id).unwrap().unwrap();
        assert_eq!(read_back.field("title").and_then(|v| v.as_text()), Some("x"));
        assert_eq!(read_back.updated_at, record.updated_at);
    }

    #[test]
    fn delete_of_created_row_leaves_no_tombstone() {
        let store = store();
        let record = store.insert(server_record("t1", "x")).unwrap();
        let id = record.id.unwrap();

        store.delete(&id).unwrap();
        assert!(!store.exists(&id).unwrap());
        assert!(!store
            .tombstones
            .is_deleted(store.entity_type(), &id)
            .unwrap());
    }

    #[test]
    fn delete_of_synced_row_writes_tombstone() {
        let store = store();
        let record = store.insert(server_record("t1", "x")).unwrap();
        let id = record.id.unwrap();
        store.mark_clean(&id).unwrap();

        store.delete(&id).unwrap();
        assert!(!store.exists(&id).unwrap());
        assert!(store
            .tombstones
            .is_deleted(store.entity_type(), &id)
            .unwrap());
    }

    #[test]
    fn delete_of_absent_row_is_noop() {
        let store = store();
        store.delete(&RecordId::new("ghost")).unwrap();
    }

    #[test]
    fn snapshot_inserts_new_record_as_clean() {
        let store = store();
        store.apply_server_record(server_record("s1", "from server")).unwrap();

        let id = RecordId::new("s1");
        assert_eq!(store.status(&id).unwrap(), Some(DirtyStatus::Clean));
        let record = store.get(&id).unwrap().unwrap();
        assert!(record.created_at.is_some());
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn snapshot_does_not_resurrect_deleted_record() {
        let store = store();
        store.insert(server_record("s1", "x")).unwrap();
        let id = RecordId::new("s1");
        store.mark_clean(&id).unwrap();
        store.delete(&id).unwrap();

        store.apply_server_record(server_record("s1", "back again")).unwrap();
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn snapshot_overwrites_clean_row() {
        let store = store();
        store.apply_server_record(server_record("s1", "old")).unwrap();
        store.apply_server_record(server_record("s1", "new")).unwrap();

        let record = store.get(&RecordId::new("s1")).unwrap().unwrap();
        assert_eq!(record.field("title").and_then(|v| v.as_text()), Some("new"));
        assert_eq!(
            store.status(&RecordId::new("s1")).unwrap(),
            Some(DirtyStatus::Clean)
        );
    }

    #[test]
    fn snapshot_application_is_idempotent() {
        let store = store();
        let incoming = server_record("s1", "same")
            .set("position", 4i64);

        store.apply_server_record(incoming.clone()).unwrap();
        let first = store.get(&RecordId::new("s1")).unwrap().unwrap();

        store.apply_server_record(incoming).unwrap();
        let second = store.get(&RecordId::new("s1")).unwrap().unwrap();

        assert_eq!(first.fields, second.fields);
        assert_eq!(
            store.status(&RecordId::new("s1")).unwrap(),
            Some(DirtyStatus::Clean)
        );
    }

    #[test]
    fn snapshot_is_discarded_for_dirty_rows() {
        let store = store();
        let record = store.insert(server_record("s1", "local")).unwrap();
        let id = record.id.clone().unwrap();

        // Created row: incoming server copy loses.
        store.apply_server_record(server_record("s1", "server")).unwrap();
        let read_back = store.get(&id).unwrap().unwrap();
        assert_eq!(read_back.field("title").and_then(|v| v.as_text()), Some("local"));
        assert_eq!(store.status(&id).unwrap(), Some(DirtyStatus::Created));

        // Updated row: same policy.
        store.mark_clean(&id).unwrap();
        store.update(read_back.set("title", "edited")).unwrap();
        store.apply_server_record(server_record("s1", "server")).unwrap();
        let read_back = store.get(&id).unwrap().unwrap();
        assert_eq!(read_back.field("title").and_then(|v| v.as_text()), Some("edited"));
        assert_eq!(store.status(&id).unwrap(), Some(DirtyStatus::Updated));
    }

    #[test]
    fn sweep_removes_clean_rows_absent_from_snapshot() {
        let store = store();
        store.apply_server_record(server_record("keep", "a")).unwrap();
        store.apply_server_record(server_record("drop", "b")).unwrap();
        store.insert(server_record("local", "c")).unwrap();

        let seen: HashSet<RecordId> = [RecordId::new("keep")].into_iter().collect();
        let removed = store.sweep_absent(&seen).unwrap();

        assert_eq!(removed, 1);
        assert!(store.exists(&RecordId::new("keep")).unwrap());
        assert!(!store.exists(&RecordId::new("drop")).unwrap());
        // Dirty rows survive the sweep.
        assert!(store.exists(&RecordId::new("local")).unwrap());
    }

    #[test]
    fn list_dirty_filters_by_status() {
        let store = store();
        store.insert(server_record("a", "x")).unwrap();
        let record = store.insert(server_record("b", "y")).unwrap();
        let id = record.id.clone().unwrap();
        store.mark_clean(&id).unwrap();
        store.update(record.set("title", "z")).unwrap();

        let created = store.list_dirty(DirtyStatus::Created).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, Some(RecordId::new("a")));

        let updated = store.list_dirty(DirtyStatus::Updated).unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id, Some(RecordId::new("b")));
    }

    #[test]
    fn query_orders_by_default_order_field() {
        let store = store();
        store
            .insert(server_record("a", "third").set("position", 3i64))
            .unwrap();
        store
            .insert(server_record("b", "first").set("position", 1i64))
            .unwrap();
        store
            .insert(server_record("c", "second").set("position", 2i64))
            .unwrap();

        let titles: Vec<String> = store
            .list()
            .unwrap()
            .into_iter()
            .filter_map(|r| r.field("title").and_then(|v| v.as_text()).map(String::from))
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn query_ordered_overrides_default_order() {
        let store = store();
        store
            .insert(server_record("a", "bravo").set("position", 1i64))
            .unwrap();
        store
            .insert(server_record("b", "alpha").set("position", 2i64))
            .unwrap();

        let titles: Vec<String> = store
            .query_ordered(|_| true, Some("title"))
            .unwrap()
            .into_iter()
            .filter_map(|r| r.field("title").and_then(|v| v.as_text()).map(String::from))
            .collect();
        assert_eq!(titles, ["alpha", "bravo"]);
    }

    #[test]
    fn clear_empties_table() {
        let store = store();
        store.insert(server_record("a", "x")).unwrap();
        store.insert(server_record("b", "y")).unwrap();

        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
