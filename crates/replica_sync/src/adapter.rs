//! Per-entity-type sync adapter.

use crate::error::{SyncError, SyncResult};
use crate::session::SessionProvider;
use crate::transport::RemoteTransport;
use crate::worker::CancelToken;
use replica_core::{CoreError, DirtyStore};
use replica_model::{DirtyStatus, EntityType, Record};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a push for one entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// Records confirmed by the server and marked clean.
    pub pushed: usize,
}

/// Result of a pull for one entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullOutcome {
    /// Records received in the server snapshot.
    pub pulled: usize,
    /// Clean rows removed because the snapshot no longer contains them.
    pub swept: usize,
}

/// Binds one entity type's local store to its remote transport.
pub struct SyncAdapter {
    store: DirtyStore,
    transport: Arc<dyn RemoteTransport>,
    session: Arc<dyn SessionProvider>,
}

impl SyncAdapter {
    /// Creates an adapter.
    pub fn new(
        store: DirtyStore,
        transport: Arc<dyn RemoteTransport>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            store,
            transport,
            session,
        }
    }

    /// The entity type this adapter synchronizes.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.store.entity_type()
    }

    /// The local store controller for this entity type.
    #[must_use]
    pub fn store(&self) -> &DirtyStore {
        &self.store
    }

    /// Pushes every dirty record of this type to the server.
    ///
    /// Locally created records go first (via the remote create), then
    /// locally updated ones (via the remote update); each confirmed
    /// record is marked clean. A record-scoped failure is logged and
    /// skipped so the remaining records still sync; if any record
    /// failed, the aggregate surfaces as [`SyncError::Push`] carrying
    /// the first failure.
    pub fn push_dirty(&self, cancel: &CancelToken) -> SyncResult<PushOutcome> {
        self.session
            .acquire_session()
            .map_err(SyncError::Session)?;

        let mut outcome = PushOutcome::default();
        let mut attempted = 0;
        let mut failed = 0;
        let mut first: Option<SyncError> = None;

        let batches = [
            (DirtyStatus::Created, true),
            (DirtyStatus::Updated, false),
        ];
        for (status, create) in batches {
            for record in self.store.list_dirty(status)? {
                cancel.check()?;
                attempted += 1;
                match self.push_one(&record, create) {
                    Ok(()) => outcome.pushed += 1,
                    Err(error) if error.is_record_scoped() => {
                        warn!(
                            entity_type = %self.entity_type(),
                            id = ?record.id,
                            error = %error,
                            "push failed for record, continuing"
                        );
                        failed += 1;
                        first.get_or_insert(error);
                    }
                    Err(error) => return Err(error),
                }
            }
        }

        match first {
            Some(first) => Err(SyncError::Push {
                entity_type: self.entity_type().as_str().to_string(),
                attempted,
                failed,
                first: Box::new(first),
            }),
            None => {
                debug!(
                    entity_type = %self.entity_type(),
                    pushed = outcome.pushed,
                    "push complete"
                );
                Ok(outcome)
            }
        }
    }

    fn push_one(&self, record: &Record, create: bool) -> SyncResult<()> {
        // The server's copy is not merged back; the next pull refreshes
        // payload and timestamps from the authoritative snapshot.
        if create {
            self.transport.create(record)?;
        } else {
            self.transport.update(record)?;
        }
        let id = record.id.as_ref().ok_or_else(|| {
            CoreError::invalid_operation(format!(
                "dirty record of entity type `{}` has no id",
                self.entity_type()
            ))
        })?;
        self.store.mark_clean(id)?;
        Ok(())
    }

    /// Pulls the full remote collection and merges it locally.
    ///
    /// Each received record is merged through the conflict-aware
    /// snapshot application; afterwards, clean rows absent from the
    /// snapshot are swept (they were deleted server-side). The sweep
    /// only runs when the whole batch was applied.
    pub fn pull_all(&self, cancel: &CancelToken) -> SyncResult<PullOutcome> {
        self.session
            .acquire_session()
            .map_err(SyncError::Session)?;

        let records = self.transport.list()?;
        let pulled = records.len();
        let mut seen = HashSet::with_capacity(pulled);
        for record in records {
            cancel.check()?;
            if let Some(id) = record.id.clone() {
                seen.insert(id);
            }
            self.store.apply_server_record(record)?;
        }
        let swept = self.store.sweep_absent(&seen)?;
        debug!(
            entity_type = %self.entity_type(),
            pulled,
            swept,
            "pull complete"
        );
        Ok(PullOutcome { pulled, swept })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MockSessionProvider, NullSessionProvider};
    use crate::transport::{MockTransport, TransportError};
    use replica_core::TombstoneLedger;
    use replica_model::{EntitySchema, FieldKind, RecordId};
    use replica_store::{MemoryRowStore, RowStore};

    fn task_schema() -> EntitySchema {
        EntitySchema::new(EntityType::new("task")).with_field("title", FieldKind::Text)
    }

    fn adapter_with(
        transport: Arc<MockTransport>,
        session: Arc<dyn SessionProvider>,
    ) -> SyncAdapter {
        let rows: Arc<dyn RowStore> = Arc::new(MemoryRowStore::new());
        let tombstones = Arc::new(TombstoneLedger::new(Arc::clone(&rows)));
        let store = DirtyStore::new(Arc::new(task_schema()), rows, tombstones);
        SyncAdapter::new(store, transport, session)
    }

    fn adapter(transport: Arc<MockTransport>) -> SyncAdapter {
        adapter_with(transport, Arc::new(NullSessionProvider::new()))
    }

    #[test]
    fn push_creates_then_marks_clean() {
        let transport = Arc::new(MockTransport::new());
        let adapter = adapter(Arc::clone(&transport));

        let record = adapter
            .store()
            .insert(Record::new().set("title", "x"))
            .unwrap();
        let id = record.id.clone().unwrap();

        let outcome = adapter.push_dirty(&CancelToken::new()).unwrap();
        assert_eq!(outcome.pushed, 1);
        assert_eq!(transport.create_calls(), 1);
        assert_eq!(
            adapter.store().status(&id).unwrap(),
            Some(DirtyStatus::Clean)
        );
    }

    #[test]
    fn push_sends_updates_via_update_operation() {
        let transport = Arc::new(MockTransport::new());
        let adapter = adapter(Arc::clone(&transport));

        let record = adapter
            .store()
            .insert(Record::with_id("t1").set("title", "x"))
            .unwrap();
        let id = record.id.clone().unwrap();
        adapter.store().mark_clean(&id).unwrap();
        adapter.store().update(record.set("title", "y")).unwrap();

        let outcome = adapter.push_dirty(&CancelToken::new()).unwrap();
        assert_eq!(outcome.pushed, 1);
        assert_eq!(transport.create_calls(), 0);
        assert_eq!(transport.update_calls(), 1);
    }

    #[test]
    fn push_continues_past_failing_record() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_record(RecordId::new("bad"));
        let adapter = adapter(Arc::clone(&transport));

        adapter
            .store()
            .insert(Record::with_id("bad").set("title", "a"))
            .unwrap();
        adapter
            .store()
            .insert(Record::with_id("good").set("title", "b"))
            .unwrap();

        let err = adapter.push_dirty(&CancelToken::new()).unwrap_err();
        match err {
            SyncError::Push {
                attempted, failed, ..
            } => {
                assert_eq!(attempted, 2);
                assert_eq!(failed, 1);
            }
            other => panic!("expected push error, got {other}"),
        }

        // The healthy record still made it and is clean now.
        assert_eq!(
            adapter.store().status(&RecordId::new("good")).unwrap(),
            Some(DirtyStatus::Clean)
        );
        assert_eq!(
            adapter.store().status(&RecordId::new("bad")).unwrap(),
            Some(DirtyStatus::Created)
        );
    }

    #[test]
    fn push_requires_session() {
        let transport = Arc::new(MockTransport::new());
        let session = Arc::new(MockSessionProvider::new());
        session.set_failing(true);
        let adapter = adapter_with(Arc::clone(&transport), session);

        adapter
            .store()
            .insert(Record::with_id("t1").set("title", "x"))
            .unwrap();

        let err = adapter.push_dirty(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, SyncError::Session(TransportError::AuthenticationRequired)));
        assert_eq!(transport.create_calls(), 0);
    }

    #[test]
    fn pull_inserts_snapshot_and_sweeps_stale_rows() {
        let transport = Arc::new(MockTransport::new());
        let adapter = adapter(Arc::clone(&transport));

        // A clean row the server no longer has.
        adapter
            .store()
            .apply_server_record(Record::with_id("stale").set("title", "old"))
            .unwrap();

        transport.set_records(vec![Record::with_id("fresh").set("title", "new")]);

        let outcome = adapter.pull_all(&CancelToken::new()).unwrap();
        assert_eq!(outcome.pulled, 1);
        assert_eq!(outcome.swept, 1);
        assert!(adapter.store().exists(&RecordId::new("fresh")).unwrap());
        assert!(!adapter.store().exists(&RecordId::new("stale")).unwrap());
    }

    #[test]
    fn pull_propagates_transport_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.set_list_error(Some(TransportError::network_unavailable("offline")));
        let adapter = adapter(Arc::clone(&transport));

        let err = adapter.pull_all(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }

    #[test]
    fn cancelled_pull_skips_sweep() {
        let transport = Arc::new(MockTransport::new());
        transport.set_records(vec![Record::with_id("a").set("title", "x")]);
        let adapter = adapter(Arc::clone(&transport));

        // A clean row that would be swept by a completed pull.
        adapter
            .store()
            .apply_server_record(Record::with_id("stale").set("title", "old"))
            .unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = adapter.pull_all(&cancel).unwrap_err();
        assert!(matches!(err, SyncError::Cancelled));
        assert!(adapter.store().exists(&RecordId::new("stale")).unwrap());
    }
}
