use crate::client::{BackendClient, BoxError, Entry};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process client that keeps entries in memory.
///
/// Submitted entries stay pending until `flush` moves them to the written
/// list. Failures can be injected to exercise error paths.
#[derive(Default)]
pub struct MemoryClient {
    pending: Mutex<Vec<Entry>>,
    written: Mutex<Vec<Entry>>,
    flushes: AtomicU64,
    fail_submit: Mutex<Option<String>>,
    fail_flush: Mutex<Option<String>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries written by a completed flush, in submission order.
    pub fn entries(&self) -> Vec<Entry> {
        self.written.lock().clone()
    }

    /// Entries submitted but not yet flushed.
    pub fn pending(&self) -> Vec<Entry> {
        self.pending.lock().clone()
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Make every following `submit` fail with `message`; `None` clears it.
    pub fn fail_submit_with(&self, message: Option<&str>) {
        *self.fail_submit.lock() = message.map(str::to_string);
    }

    /// Make every following `flush` fail with `message`; `None` clears it.
    pub fn fail_flush_with(&self, message: Option<&str>) {
        *self.fail_flush.lock() = message.map(str::to_string);
    }
}

impl BackendClient for MemoryClient {
    fn submit(&self, entry: Entry) -> Result<(), BoxError> {
        if let Some(message) = self.fail_submit.lock().as_ref() {
            return Err(message.clone().into());
        }
        self.pending.lock().push(entry);
        Ok(())
    }

    fn flush(&self) -> Result<(), BoxError> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.fail_flush.lock().as_ref() {
            return Err(message.clone().into());
        }
        let drained = std::mem::take(&mut *self.pending.lock());
        self.written.lock().extend(drained);
        Ok(())
    }
}

/// A client that simply drops all entries.
///
/// Useful for measuring the overhead of the handler itself without any
/// external I/O.
#[derive(Clone, Default)]
pub struct NoopClient;

impl BackendClient for NoopClient {
    fn submit(&self, _entry: Entry) -> Result<(), BoxError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
