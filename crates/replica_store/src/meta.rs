//! Durable key/value storage for sync metadata.

use crate::error::StoreResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Process-wide durable key/value storage.
///
/// The engine keeps a single watermark timestamp here; nothing in the
/// core assumes any richer semantics than get/put/remove of string
/// values.
pub trait MetaStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn put(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes a value, if present.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// An in-memory meta store for tests and ephemeral replicas.
#[derive(Debug, Default)]
pub struct MemoryMetaStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryMetaStore {
    /// Creates a new empty meta store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetaStore for MemoryMetaStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}
