//! In-memory row store backend.

use crate::error::{StoreError, StoreResult};
use crate::row::{RowStore, StoreImage};
use parking_lot::RwLock;
use replica_model::{RecordId, StoredRecord};
use std::collections::BTreeMap;

/// A thread-safe in-memory row store.
///
/// The reference backend: suitable for unit tests, integration tests,
/// and ephemeral replicas that do not need persistence.
///
/// # Example
///
/// ```rust
/// use replica_model::{DirtyStatus, Record, RecordId, StoredRecord};
/// use replica_store::{MemoryRowStore, RowStore};
///
/// let store = MemoryRowStore::new();
/// let id = RecordId::new("r1");
/// let row = StoredRecord::new(Record::with_id("r1"), DirtyStatus::Created);
/// store.insert("task", &id, row).unwrap();
/// assert_eq!(store.count("task").unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    tables: RwLock<BTreeMap<String, BTreeMap<RecordId, StoredRecord>>>,
}

impl MemoryRowStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of tables that currently hold at least one row.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables
            .read()
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl RowStore for MemoryRowStore {
    fn get(&self, table: &str, id: &RecordId) -> StoreResult<Option<StoredRecord>> {
        Ok(self
            .tables
            .read()
            .get(table)
            .and_then(|rows| rows.get(id))
            .cloned())
    }

    fn insert(&self, table: &str, id: &RecordId, row: StoredRecord) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        if rows.contains_key(id) {
            return Err(StoreError::DuplicateRow {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        rows.insert(id.clone(), row);
        Ok(())
    }

    fn update(&self, table: &str, id: &RecordId, row: StoredRecord) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        if !rows.contains_key(id) {
            return Err(StoreError::MissingRow {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        rows.insert(id.clone(), row);
        Ok(())
    }

    fn delete(&self, table: &str, id: &RecordId) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        Ok(tables
            .get_mut(table)
            .map(|rows| rows.remove(id).is_some())
            .unwrap_or(false))
    }

    fn select(
        &self,
        table: &str,
        predicate: &dyn Fn(&StoredRecord) -> bool,
    ) -> StoreResult<Vec<StoredRecord>> {
        Ok(self
            .tables
            .read()
            .get(table)
            .map(|rows| rows.values().filter(|row| predicate(row)).cloned().collect())
            .unwrap_or_default())
    }

    fn count(&self, table: &str) -> StoreResult<usize> {
        Ok(self
            .tables
            .read()
            .get(table)
            .map(|rows| rows.len())
            .unwrap_or(0))
    }

    fn clear_table(&self, table: &str) -> StoreResult<()> {
        if let Some(rows) = self.tables.write().get_mut(table) {
            rows.clear();
        }
        Ok(())
    }

    fn checkpoint(&self) -> StoreResult<StoreImage> {
        Ok(StoreImage {
            tables: self.tables.read().clone(),
        })
    }

    fn restore(&self, image: StoreImage) -> StoreResult<()> {
        *self.tables.write() = image.tables;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_model::{DirtyStatus, Record};

    fn row(id: &str, dirty: DirtyStatus) -> (RecordId, StoredRecord) {
        (
            RecordId::new(id),
            StoredRecord::new(Record::with_id(id), dirty),
        )
    }

    #[test]
    fn insert_and_get() {
        let store = MemoryRowStore::new();
        let (id, record) = row("a", DirtyStatus::Created);
        store.insert("task", &id, record.clone()).unwrap();

        let found = store.get("task", &id).unwrap();
        assert_eq!(found, Some(record));
        assert!(store.get("task", &RecordId::new("b")).unwrap().is_none());
        assert!(store.get("other", &id).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_fails() {
        let store = MemoryRowStore::new();
        let (id, record) = row("a", DirtyStatus::Created);
        store.insert("task", &id, record.clone()).unwrap();

        let result = store.insert("task", &id, record);
        assert!(matches!(result, Err(StoreError::DuplicateRow { .. })));
    }

    #[test]
    fn update_missing_fails() {
        let store = MemoryRowStore::new();
        let (id, record) = row("a", DirtyStatus::Clean);
        let result = store.update("task", &id, record);
        assert!(matches!(result, Err(StoreError::MissingRow { .. })));
    }

    #[test]
    fn update_replaces_row() {
        let store = MemoryRowStore::new();
        let (id, record) = row("a", DirtyStatus::Created);
        store.insert("task", &id, record).unwrap();

        let replacement = StoredRecord::new(
            Record::with_id("a").set("name", "renamed"),
            DirtyStatus::Updated,
        );
        store.update("task", &id, replacement.clone()).unwrap();
        assert_eq!(store.get("task", &id).unwrap(), Some(replacement));
    }

    #[test]
    fn delete_reports_existence() {
        let store = MemoryRowStore::new();
        let (id, record) = row("a", DirtyStatus::Clean);
        store.insert("task", &id, record).unwrap();

        assert!(store.delete("task", &id).unwrap());
        assert!(!store.delete("task", &id).unwrap());
    }

    #[test]
    fn select_filters_rows() {
        let store = MemoryRowStore::new();
        for (name, dirty) in [
            ("a", DirtyStatus::Clean),
            ("b", DirtyStatus::Created),
            ("c", DirtyStatus::Created),
        ] {
            let (id, record) = row(name, dirty);
            store.insert("task", &id, record).unwrap();
        }

        let created = store
            .select("task", &|row| row.dirty == DirtyStatus::Created)
            .unwrap();
        assert_eq!(created.len(), 2);

        let all = store.select("task", &|_| true).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn select_is_id_ordered() {
        let store = MemoryRowStore::new();
        for name in ["c", "a", "b"] {
            let (id, record) = row(name, DirtyStatus::Clean);
            store.insert("task", &id, record).unwrap();
        }

        let ids: Vec<String> = store
            .select("task", &|_| true)
            .unwrap()
            .into_iter()
            .filter_map(|r| r.record.id.map(|id| id.to_string()))
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn clear_table_removes_rows() {
        let store = MemoryRowStore::new();
        let (id, record) = row("a", DirtyStatus::Clean);
        store.insert("task", &id, record).unwrap();
        store.clear_table("task").unwrap();
        assert_eq!(store.count("task").unwrap(), 0);
    }

    #[test]
    fn checkpoint_and_restore() {
        let store = MemoryRowStore::new();
        let (id, record) = row("a", DirtyStatus::Clean);
        store.insert("task", &id, record).unwrap();

        let image = store.checkpoint().unwrap();
        store.clear_table("task").unwrap();
        let (id2, record2) = row("b", DirtyStatus::Created);
        store.insert("task", &id2, record2).unwrap();

        store.restore(image).unwrap();
        assert!(store.get("task", &id).unwrap().is_some());
        assert!(store.get("task", &id2).unwrap().is_none());
    }

    #[test]
    fn table_names_skips_empty_tables() {
        let store = MemoryRowStore::new();
        let (id, record) = row("a", DirtyStatus::Clean);
        store.insert("task", &id, record).unwrap();
        store.insert("note", &RecordId::new("n"), StoredRecord::new(Record::with_id("n"), DirtyStatus::Clean)).unwrap();
        store.clear_table("note").unwrap();

        assert_eq!(store.table_names(), vec!["task".to_string()]);
    }
}
