//! Cross-crate scenario helpers.

use crate::fixtures::{EngineHarness, PROJECT, WAIT};
use replica_model::{DirtyStatus, Record, RecordId};

/// Inserts records as local edits on the harness's project store.
///
/// # Panics
///
/// Panics on store errors; scenarios expect well-formed fixtures.
pub fn seed_projects(harness: &EngineHarness, records: Vec<Record>) {
    for record in records {
        harness
            .engine
            .with_store(PROJECT, move |store| store.insert(record))
            .expect("seed insert");
    }
}

/// Reads back the dirty status of one project row.
///
/// # Panics
///
/// Panics on store errors.
#[must_use]
pub fn project_status(harness: &EngineHarness, id: &RecordId) -> Option<DirtyStatus> {
    let id = id.clone();
    harness
        .engine
        .with_store(PROJECT, move |store| store.status(&id))
        .expect("status read")
}

/// Runs a full forced sync pass and panics on failure.
pub fn sync_once(harness: &EngineHarness) {
    harness
        .engine
        .synchronize_blocking(true, WAIT)
        .expect("sync pass");
}
