//! Storage worker thread and completion primitives.

use crate::error::{SyncError, SyncResult};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A single dedicated thread that sequences all local-store mutations.
///
/// Every sync pass and every local mutation submitted through the
/// engine runs as a job on this thread, so two writers never race on
/// the same row store. Jobs run in submission order.
pub struct StorageWorker {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl StorageWorker {
    /// Spawns the worker thread.
    pub fn spawn() -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name("replica-storage".into())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    job();
                }
            })?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Enqueues a job on the worker.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> SyncResult<()> {
        match self.sender.lock().as_ref() {
            Some(sender) => sender
                .send(Box::new(job))
                .map_err(|_| SyncError::WorkerGone),
            None => Err(SyncError::WorkerGone),
        }
    }

    /// Stops accepting jobs, drains the queue and joins the thread.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StorageWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A single-count wait latch carrying the operation's result.
///
/// The producer signals once; the consumer takes the value with an
/// unbounded or bounded wait. A second signal is discarded.
pub struct Completion<T> {
    slot: Mutex<Option<T>>,
    signaled: AtomicBool,
    condvar: Condvar,
}

impl<T> Completion<T> {
    /// Creates an unsignaled completion.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            signaled: AtomicBool::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Stores the result and wakes all waiters. The first signal wins.
    pub fn signal(&self, value: T) {
        let mut slot = self.slot.lock();
        if !self.signaled.swap(true, Ordering::SeqCst) {
            *slot = Some(value);
        }
        drop(slot);
        self.condvar.notify_all();
    }

    /// Returns true once the completion has been signaled.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::SeqCst)
    }

    /// Blocks until signaled and takes the value.
    pub fn wait(&self) -> T {
        let mut slot = self.slot.lock();
        loop {
            if let Some(value) = slot.take() {
                return value;
            }
            self.condvar.wait(&mut slot);
        }
    }

    /// Blocks at most `timeout`, taking the value if signaled in time.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        loop {
            if let Some(value) = slot.take() {
                return Some(value);
            }
            if self.condvar.wait_until(&mut slot, deadline).timed_out() {
                return slot.take();
            }
        }
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation flag for an in-flight pass.
///
/// Checked between adapters and between per-record applications; a
/// single record's snapshot application is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with [`SyncError::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> SyncResult<()> {
        if self.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}
