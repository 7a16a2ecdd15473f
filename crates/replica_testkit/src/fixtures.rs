//! Fixture schemas and an engine harness.

use replica_model::{EntitySchema, EntityType, FieldKind, FieldValue, Record};
use replica_store::{MemoryMetaStore, MemoryRowStore};
use replica_sync::{
    MockSessionProvider, MockTransport, RemoteTransport, SyncConfig, SyncEngine,
    SyncEngineBuilder,
};
use std::sync::Arc;
use std::time::Duration;

/// Default bounded wait for blocking calls in tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Fixture project entity type.
pub const PROJECT: EntityType = EntityType::new("project");
/// Fixture task entity type; tasks belong to projects.
pub const TASK: EntityType = EntityType::new("task");

/// Schema for the fixture project type.
#[must_use]
pub fn project_schema() -> EntitySchema {
    EntitySchema::new(PROJECT)
        .with_field("name", FieldKind::Text)
        .with_default_order("name")
}

/// Schema for the fixture task type (belongs to project).
#[must_use]
pub fn task_schema() -> EntitySchema {
    EntitySchema::new(TASK)
        .with_field("title", FieldKind::Text)
        .with_field("project_id", FieldKind::Text)
        .with_field("position", FieldKind::Int)
        .with_default_order("position")
        .with_belongs_to(PROJECT)
}

/// Builds a project record.
#[must_use]
pub fn project_record(id: &str, name: &str) -> Record {
    Record::with_id(id).set("name", name)
}

/// Builds a task record referencing a project.
#[must_use]
pub fn task_record(id: &str, title: &str, project_id: &str) -> Record {
    Record::with_id(id)
        .set("title", title)
        .set("project_id", project_id)
        .set("position", 0i64)
}

/// Builds a record from a JSON object, mapping JSON scalars onto field
/// values (strings → text, integers → int, other numbers → double,
/// booleans → bool, null → null).
///
/// # Panics
///
/// Panics when the JSON value is not an object of scalars; fixtures
/// are expected to be well-formed.
#[must_use]
pub fn record_from_json(id: &str, json: serde_json::Value) -> Record {
    let object = json.as_object().expect("fixture payload must be an object");
    let mut record = Record::with_id(id);
    for (key, value) in object {
        let field: FieldValue = match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Double(n.as_f64().expect("numeric fixture value")),
            },
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            other => panic!("unsupported fixture value: {other}"),
        };
        record.put(key.clone(), field);
    }
    record
}

/// An engine over in-memory stores and scripted transports, wired for
/// the fixture project/task types.
pub struct EngineHarness {
    /// The engine under test.
    pub engine: SyncEngine,
    /// Scripted transport behind the project type.
    pub projects: Arc<MockTransport>,
    /// Scripted transport behind the task type.
    pub tasks: Arc<MockTransport>,
    /// The session provider consulted by every adapter.
    pub session: Arc<MockSessionProvider>,
}

impl EngineHarness {
    /// Builds a harness with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Builds a harness with a custom engine configuration.
    #[must_use]
    pub fn with_config(config: SyncConfig) -> Self {
        let projects = Arc::new(MockTransport::new());
        let tasks = Arc::new(MockTransport::new());
        let session = Arc::new(MockSessionProvider::new());

        let engine = SyncEngineBuilder::new(
            Arc::new(MemoryRowStore::new()),
            Arc::new(MemoryMetaStore::new()),
        )
        .with_config(config)
        .with_session_provider(Arc::clone(&session) as Arc<dyn replica_sync::SessionProvider>)
        .register(project_schema(), Arc::clone(&projects) as Arc<dyn RemoteTransport>)
        .register(task_schema(), Arc::clone(&tasks) as Arc<dyn RemoteTransport>)
        .build()
        .expect("fixture schemas build");

        Self {
            engine,
            projects,
            tasks,
            session,
        }
    }
}

impl Default for EngineHarness {
    fn default() -> Self {
        Self::new()
    }
}
