//! Remote transport boundary.

use parking_lot::Mutex;
use replica_model::{Record, RecordId, Timestamp};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Result type for remote calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Classified remote call failure.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The network is unreachable.
    #[error("network unavailable: {message}")]
    NetworkUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// The server requires a session the client does not hold.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The server rejected or failed the request.
    #[error("server error: {message}")]
    Server {
        /// Description of the failure.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("parse error: {message}")]
    Parse {
        /// Description of the failure.
        message: String,
    },
}

impl TransportError {
    /// Creates a network-unavailable error.
    pub fn network_unavailable(message: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            message: message.into(),
        }
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Remote operations for one entity type's collection.
///
/// This trait is the wire boundary of the engine: implementations own
/// the protocol, routes and serialization, none of which the engine
/// cares about. Calls are synchronous from the storage worker's point
/// of view; implementations are free to block on their own I/O.
pub trait RemoteTransport: Send + Sync {
    /// Fetches the full remote collection.
    fn list(&self) -> TransportResult<Vec<Record>>;

    /// Creates a record remotely, returning the server's copy.
    fn create(&self, record: &Record) -> TransportResult<Record>;

    /// Updates a record remotely, returning the server's copy.
    fn update(&self, record: &Record) -> TransportResult<Record>;

    /// Deletes a record remotely.
    fn delete(&self, id: &RecordId) -> TransportResult<()>;
}

/// A scripted transport for tests.
///
/// Behaves like a tiny server: `list` serves the collection seeded by
/// [`MockTransport::set_records`], and accepted pushes mutate that
/// collection so later pulls see them. Every call is counted, pushed
/// records are kept for assertions, and failures can be injected
/// globally or for individual record IDs.
#[derive(Debug, Default)]
pub struct MockTransport {
    records: Mutex<Vec<Record>>,
    list_error: Mutex<Option<TransportError>>,
    push_error: Mutex<Option<TransportError>>,
    failing_ids: Mutex<HashSet<RecordId>>,
    created: Mutex<Vec<Record>>,
    updated: Mutex<Vec<Record>>,
    deleted: Mutex<Vec<RecordId>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockTransport {
    /// Creates a transport with an empty remote collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport serving the given collection.
    #[must_use]
    pub fn with_records(records: Vec<Record>) -> Self {
        let transport = Self::new();
        transport.set_records(records);
        transport
    }

    /// Replaces the collection served by `list`.
    pub fn set_records(&self, records: Vec<Record>) {
        *self.records.lock() = records;
    }

    /// Makes every `list` call fail with the given error.
    pub fn set_list_error(&self, error: Option<TransportError>) {
        *self.list_error.lock() = error;
    }

    /// Makes every `create`/`update`/`delete` call fail.
    pub fn set_push_error(&self, error: Option<TransportError>) {
        *self.push_error.lock() = error;
    }

    /// Makes pushes of one specific record ID fail with a server error.
    pub fn fail_record(&self, id: RecordId) {
        self.failing_ids.lock().insert(id);
    }

    /// Records accepted by `create`, in call order.
    #[must_use]
    pub fn created_records(&self) -> Vec<Record> {
        self.created.lock().clone()
    }

    /// Records accepted by `update`, in call order.
    #[must_use]
    pub fn updated_records(&self) -> Vec<Record> {
        self.updated.lock().clone()
    }

    /// IDs accepted by `delete`, in call order.
    #[must_use]
    pub fn deleted_ids(&self) -> Vec<RecordId> {
        self.deleted.lock().clone()
    }

    /// Number of `list` calls so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `create` calls so far.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `update` calls so far.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls so far.
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn check_push(&self, record: &Record) -> TransportResult<()> {
        if let Some(error) = self.push_error.lock().clone() {
            return Err(error);
        }
        if let Some(id) = &record.id {
            if self.failing_ids.lock().contains(id) {
                return Err(TransportError::server(format!("injected failure for `{id}`")));
            }
        }
        Ok(())
    }

    fn stamp(record: &Record) -> Record {
        let mut confirmed = record.clone();
        let now = Timestamp::now();
        confirmed.created_at = confirmed.created_at.or(Some(now));
        confirmed.updated_at = Some(now);
        confirmed
    }

    fn upsert(&self, record: &Record) {
        let mut records = self.records.lock();
        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
    }
}

impl RemoteTransport for MockTransport {
    fn list(&self) -> TransportResult<Vec<Record>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.list_error.lock().clone() {
            return Err(error);
        }
        Ok(self.records.lock().clone())
    }

    fn create(&self, record: &Record) -> TransportResult<Record> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_push(record)?;
        let confirmed = Self::stamp(record);
        self.upsert(&confirmed);
        self.created.lock().push(confirmed.clone());
        Ok(confirmed)
    }

    fn update(&self, record: &Record) -> TransportResult<Record> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_push(record)?;
        let confirmed = Self::stamp(record);
        self.upsert(&confirmed);
        self.updated.lock().push(confirmed.clone());
        Ok(confirmed)
    }

    fn delete(&self, id: &RecordId) -> TransportResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.push_error.lock().clone() {
            return Err(error);
        }
        self.records
            .lock()
            .retain(|record| record.id.as_ref() != Some(id));
        self.deleted.lock().push(id.clone());
        Ok(())
    }
}
