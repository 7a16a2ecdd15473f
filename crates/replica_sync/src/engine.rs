//! Sync engine: dependency-ordered push/pull passes.

use crate::adapter::SyncAdapter;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::session::{NullSessionProvider, SessionProvider};
use crate::transport::RemoteTransport;
use crate::worker::{CancelToken, Completion, StorageWorker};
use parking_lot::RwLock;
use replica_core::{CoreError, DependencyGraph, DirtyStore, TombstoneLedger};
use replica_model::{EntitySchema, EntityType, Timestamp};
use replica_store::{MetaStore, RowStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Meta-store key holding the last successful full download time.
const WATERMARK_KEY: &str = "replica.last_full_download";

/// The observable state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No pass has run yet, or none is in flight.
    Idle,
    /// A pass is pushing dirty records.
    Pushing,
    /// A pass is pulling server snapshots.
    Pulling,
    /// The last pass completed successfully.
    Synced,
    /// The last pass failed.
    Failed,
}

impl SyncState {
    /// Returns true while a pass is actively touching stores or network.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Pushing | SyncState::Pulling)
    }
}

/// Summary of one completed pass.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Records confirmed pushed across all entity types.
    pub pushed: usize,
    /// Records received in server snapshots across all entity types.
    pub pulled: usize,
    /// Clean rows removed because snapshots no longer contained them.
    pub swept: usize,
    /// Wall-clock duration of the pass.
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy)]
enum PassKind {
    Synchronize { force: bool },
    Download { force: bool },
    Push,
    Reload,
}

/// Completion handle for an in-flight pass.
///
/// Dropping the handle detaches the pass; it keeps running and its
/// outcome stays readable through [`SyncEngine::state`] and
/// [`SyncEngine::last_report`].
pub struct PassHandle {
    completion: Arc<Completion<SyncResult<PassReport>>>,
    cancel: CancelToken,
}

impl PassHandle {
    /// Requests cancellation of the pass.
    ///
    /// Observed between records and adapters; a single record's
    /// snapshot application is never interrupted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the pass has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completion.is_signaled()
    }

    /// Blocks until the pass completes.
    pub fn wait(self) -> SyncResult<PassReport> {
        self.completion.wait()
    }

    /// Blocks at most `timeout`; on expiry the pass is cancelled and
    /// [`SyncError::Timeout`] is returned.
    pub fn wait_timeout(self, timeout: Duration) -> SyncResult<PassReport> {
        match self.completion.wait_timeout(timeout) {
            Some(result) => result,
            None => {
                self.cancel.cancel();
                Err(SyncError::Timeout)
            }
        }
    }
}

struct EngineInner {
    config: SyncConfig,
    adapters: Vec<SyncAdapter>,
    order: Vec<EntityType>,
    row_store: Arc<dyn RowStore>,
    meta: Arc<dyn MetaStore>,
    tombstones: Arc<TombstoneLedger>,
    state: RwLock<SyncState>,
    running: AtomicBool,
    last_report: RwLock<Option<PassReport>>,
}

impl EngineInner {
    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    fn adapter(&self, entity_type: EntityType) -> Option<&SyncAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.entity_type() == entity_type)
    }

    fn watermark(&self) -> SyncResult<Option<Timestamp>> {
        let Some(raw) = self.meta.get(WATERMARK_KEY).map_err(CoreError::from)? else {
            return Ok(None);
        };
        match raw.parse::<i64>() {
            Ok(millis) => Ok(Some(Timestamp::from_millis(millis))),
            Err(_) => {
                warn!(%raw, "unreadable download watermark, ignoring");
                Ok(None)
            }
        }
    }

    fn set_watermark(&self, at: Timestamp) -> SyncResult<()> {
        self.meta
            .put(WATERMARK_KEY, &at.as_millis().to_string())
            .map_err(CoreError::from)?;
        Ok(())
    }

    fn within_throttle_window(&self) -> SyncResult<bool> {
        let Some(watermark) = self.watermark()? else {
            return Ok(false);
        };
        let age = Timestamp::now().millis_since(watermark);
        Ok(age >= 0 && (age as u128) < self.config.throttle_interval.as_millis())
    }

    fn run_pass(&self, kind: PassKind, cancel: &CancelToken) -> SyncResult<PassReport> {
        let start = Instant::now();
        let result = self.execute(kind, cancel);
        let duration = start.elapsed();
        match result {
            Ok((pushed, pull)) => {
                let (pulled, swept) = pull.unwrap_or((0, 0));
                let report = PassReport {
                    pushed,
                    pulled,
                    swept,
                    duration,
                };
                *self.last_report.write() = Some(report.clone());
                self.set_state(SyncState::Synced);
                info!(pushed, pulled, swept, "sync pass complete");
                Ok(report)
            }
            Err(error) => {
                self.set_state(SyncState::Failed);
                warn!(error = %error, "sync pass failed");
                Err(error)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn execute(
        &self,
        kind: PassKind,
        cancel: &CancelToken,
    ) -> SyncResult<(usize, Option<(usize, usize)>)> {
        match kind {
            PassKind::Push => Ok((self.push_phase(cancel)?, None)),
            PassKind::Synchronize { force } => {
                let pushed = self.push_phase(cancel)?;
                let pull = self.pull_phase(force, cancel)?;
                Ok((pushed, pull))
            }
            PassKind::Download { force } => Ok((0, self.pull_phase(force, cancel)?)),
            PassKind::Reload => {
                let image = self.row_store.checkpoint().map_err(CoreError::from)?;
                match self.clear_and_pull(cancel) {
                    Ok(pull) => Ok((0, Some(pull))),
                    Err(error) => {
                        if let Err(restore_error) = self.row_store.restore(image) {
                            warn!(error = %restore_error, "restore after failed reload also failed");
                        }
                        Err(error)
                    }
                }
            }
        }
    }

    /// Pushes all adapters in dependency order; the first adapter
    /// failure aborts the remainder of the phase.
    fn push_phase(&self, cancel: &CancelToken) -> SyncResult<usize> {
        self.set_state(SyncState::Pushing);
        let mut pushed = 0;
        for adapter in &self.adapters {
            cancel.check()?;
            pushed += adapter.push_dirty(cancel)?.pushed;
        }
        Ok(pushed)
    }

    /// Pulls all adapters in dependency order, or skips entirely when
    /// a non-forced download falls inside the throttle window. The
    /// watermark advances only after every adapter pulled cleanly.
    fn pull_phase(
        &self,
        force: bool,
        cancel: &CancelToken,
    ) -> SyncResult<Option<(usize, usize)>> {
        if !force && self.within_throttle_window()? {
            debug!("download throttled, serving local data");
            return Ok(None);
        }
        self.set_state(SyncState::Pulling);
        let mut pulled = 0;
        let mut swept = 0;
        for adapter in &self.adapters {
            cancel.check()?;
            let outcome = adapter.pull_all(cancel)?;
            pulled += outcome.pulled;
            swept += outcome.swept;
        }
        self.set_watermark(Timestamp::now())?;
        Ok(Some((pulled, swept)))
    }

    fn clear_and_pull(&self, cancel: &CancelToken) -> SyncResult<(usize, usize)> {
        for adapter in &self.adapters {
            adapter.store().clear()?;
        }
        self.tombstones.clear_all()?;
        match self.pull_phase(true, cancel)? {
            Some(counts) => Ok(counts),
            // Forced pulls are never throttled.
            None => Ok((0, 0)),
        }
    }
}

/// Coordinates all entity types through push-then-pull sync passes.
///
/// Built once at startup from an explicit [`SyncEngineBuilder`]; the
/// dependency order over entity types is computed at build time and
/// reused for every pass. Passes run on a dedicated storage worker so
/// local mutations are strictly sequenced; at most one pass is in
/// flight at a time, and a pass requested while another runs is
/// rejected with [`SyncError::AlreadyRunning`].
pub struct SyncEngine {
    inner: Arc<EngineInner>,
    worker: Arc<StorageWorker>,
}

impl SyncEngine {
    /// The current engine state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.inner.state.read()
    }

    /// Entity types in the order passes visit them.
    #[must_use]
    pub fn order(&self) -> &[EntityType] {
        &self.inner.order
    }

    /// Summary of the last successful pass, if any.
    #[must_use]
    pub fn last_report(&self) -> Option<PassReport> {
        self.inner.last_report.read().clone()
    }

    /// Timestamp of the last successful full download, if any.
    pub fn watermark(&self) -> SyncResult<Option<Timestamp>> {
        self.inner.watermark()
    }

    /// Runs a closure against one entity type's store on the storage
    /// worker, serialized behind any in-flight pass.
    ///
    /// This is the supported path for local reads and writes: all
    /// store mutations for all entity types execute on one worker, so
    /// application edits never race a running pass.
    pub fn with_store<T, F>(&self, entity_type: EntityType, f: F) -> SyncResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DirtyStore) -> replica_core::CoreResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let completion = Arc::new(Completion::new());
        let signal = Arc::clone(&completion);
        self.worker.submit(move || {
            let result = match inner.adapter(entity_type) {
                Some(adapter) => f(adapter.store()).map_err(SyncError::from),
                None => Err(SyncError::Core(CoreError::invalid_operation(format!(
                    "unknown entity type `{entity_type}`"
                )))),
            };
            signal.signal(result);
        })?;
        completion.wait()
    }

    /// Runs a full pass: push in dependency order, then pull in the
    /// same order if the push fully succeeded.
    pub fn synchronize(&self, force: bool) -> SyncResult<PassHandle> {
        self.start_pass(PassKind::Synchronize { force })
    }

    /// Runs a push-only pass.
    pub fn send_dirty(&self) -> SyncResult<PassHandle> {
        self.start_pass(PassKind::Push)
    }

    /// Runs a pull-only pass.
    ///
    /// With `force` false, a download inside the throttle window
    /// succeeds immediately without any remote call.
    pub fn download(&self, force: bool) -> SyncResult<PassHandle> {
        self.start_pass(PassKind::Download { force })
    }

    /// Destructively reloads the replica: clears every registered
    /// table and all tombstones, then downloads everything anew.
    ///
    /// Used after a login or identity switch, where stale local data
    /// must not leak forward. The clear-then-repopulate is
    /// all-or-nothing: on failure the previous contents are restored.
    pub fn reload_all(&self) -> SyncResult<PassHandle> {
        self.start_pass(PassKind::Reload)
    }

    /// Blocking [`SyncEngine::synchronize`] with a bounded wait.
    pub fn synchronize_blocking(&self, force: bool, timeout: Duration) -> SyncResult<PassReport> {
        self.synchronize(force)?.wait_timeout(timeout)
    }

    /// Blocking [`SyncEngine::send_dirty`] with a bounded wait.
    pub fn send_dirty_blocking(&self, timeout: Duration) -> SyncResult<PassReport> {
        self.send_dirty()?.wait_timeout(timeout)
    }

    /// Blocking [`SyncEngine::download`] with a bounded wait.
    pub fn download_blocking(&self, force: bool, timeout: Duration) -> SyncResult<PassReport> {
        self.download(force)?.wait_timeout(timeout)
    }

    /// Blocking [`SyncEngine::reload_all`] with a bounded wait.
    pub fn reload_all_blocking(&self, timeout: Duration) -> SyncResult<PassReport> {
        self.reload_all()?.wait_timeout(timeout)
    }

    fn start_pass(&self, kind: PassKind) -> SyncResult<PassHandle> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(SyncError::AlreadyRunning);
        }

        let completion = Arc::new(Completion::new());
        let cancel = CancelToken::new();
        let inner = Arc::clone(&self.inner);
        let signal = Arc::clone(&completion);
        let token = cancel.clone();

        let submitted = self.worker.submit(move || {
            let result = inner.run_pass(kind, &token);
            inner.running.store(false, Ordering::SeqCst);
            signal.signal(result);
        });
        if let Err(error) = submitted {
            self.inner.running.store(false, Ordering::SeqCst);
            return Err(error);
        }

        Ok(PassHandle { completion, cancel })
    }
}

/// Explicit engine configuration, constructed at startup.
///
/// One registration per entity type: its schema and its remote
/// transport. Building the engine resolves schemas and the dependency
/// order once; a declared reference cycle fails construction.
pub struct SyncEngineBuilder {
    row_store: Arc<dyn RowStore>,
    meta: Arc<dyn MetaStore>,
    session: Arc<dyn SessionProvider>,
    config: SyncConfig,
    registrations: Vec<(EntitySchema, Arc<dyn RemoteTransport>)>,
}

impl SyncEngineBuilder {
    /// Starts a builder over the given local stores.
    pub fn new(row_store: Arc<dyn RowStore>, meta: Arc<dyn MetaStore>) -> Self {
        Self {
            row_store,
            meta,
            session: Arc::new(NullSessionProvider::new()),
            config: SyncConfig::default(),
            registrations: Vec::new(),
        }
    }

    /// Sets the session provider consulted before remote calls.
    #[must_use]
    pub fn with_session_provider(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = session;
        self
    }

    /// Overrides the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers one entity type: its schema and remote transport.
    ///
    /// Registration order breaks ties between independent types, so
    /// it is part of the engine's deterministic behavior.
    #[must_use]
    pub fn register(
        mut self,
        schema: EntitySchema,
        transport: Arc<dyn RemoteTransport>,
    ) -> Self {
        self.registrations.push((schema, transport));
        self
    }

    /// Builds the engine, resolving schemas and the dependency order.
    pub fn build(self) -> SyncResult<SyncEngine> {
        let mut graph = DependencyGraph::new();
        let mut by_type: HashMap<EntityType, (EntitySchema, Arc<dyn RemoteTransport>)> =
            HashMap::new();
        for (schema, transport) in self.registrations {
            schema.check().map_err(CoreError::from)?;
            let entity_type = schema.entity_type();
            if by_type.contains_key(&entity_type) {
                return Err(SyncError::Core(CoreError::invalid_operation(format!(
                    "entity type `{entity_type}` registered twice"
                ))));
            }
            graph.add_type(entity_type, schema.belongs_to());
            by_type.insert(entity_type, (schema, transport));
        }

        let order = graph.topological_order()?;
        let tombstones = Arc::new(TombstoneLedger::new(Arc::clone(&self.row_store)));

        // Types appearing only as reference targets have no adapter.
        let adapters: Vec<SyncAdapter> = order
            .iter()
            .filter_map(|entity_type| by_type.remove(entity_type))
            .map(|(schema, transport)| {
                let store = DirtyStore::new(
                    Arc::new(schema),
                    Arc::clone(&self.row_store),
                    Arc::clone(&tombstones),
                );
                SyncAdapter::new(store, transport, Arc::clone(&self.session))
            })
            .collect();

        let worker = StorageWorker::spawn()
            .map_err(|error| CoreError::from(replica_store::StoreError::from(error)))?;

        debug!(order = ?order, "sync engine built");
        Ok(SyncEngine {
            inner: Arc::new(EngineInner {
                config: self.config,
                adapters,
                order,
                row_store: self.row_store,
                meta: self.meta,
                tombstones,
                state: RwLock::new(SyncState::Idle),
                running: AtomicBool::new(false),
                last_report: RwLock::new(None),
            }),
            worker: Arc::new(worker),
        })
    }
}
