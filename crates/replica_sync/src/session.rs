//! Session acquisition boundary.

use crate::transport::{TransportError, TransportResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Credentials and parameters attached to remote calls.
///
/// The engine never looks inside a session; it only requires that one
/// can be acquired before push or pull touches the network.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    values: BTreeMap<String, String>,
}

impl SessionContext {
    /// Creates an empty (anonymous) session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a key/value pair, e.g. an auth token.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Looks up an attached value.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Acquires a session before any remote call.
///
/// Session acquisition is a precondition of both push and pull for
/// every adapter; its failure propagates as a sync failure.
pub trait SessionProvider: Send + Sync {
    /// Acquires a session, failing if credentials cannot be obtained.
    fn acquire_session(&self) -> TransportResult<SessionContext>;
}

/// A provider for servers that require no authentication.
#[derive(Debug, Default)]
pub struct NullSessionProvider;

impl NullSessionProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SessionProvider for NullSessionProvider {
    fn acquire_session(&self) -> TransportResult<SessionContext> {
        Ok(SessionContext::new())
    }
}

/// A scripted provider for tests: counts calls and can be switched to
/// fail with `AuthenticationRequired`.
#[derive(Debug, Default)]
pub struct MockSessionProvider {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockSessionProvider {
    /// Creates a provider that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent acquisitions fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of acquisitions so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionProvider for MockSessionProvider {
    fn acquire_session(&self) -> TransportResult<SessionContext> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(TransportError::AuthenticationRequired)
        } else {
            Ok(SessionContext::new().with_value("token", "mock"))
        }
    }
}
