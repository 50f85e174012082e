use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// In-memory byte sink a formatter writes one record into.
///
/// Reading does not clear the contents; callers that consume the bytes use
/// [`BufferSink::drain`] so reading and resetting cannot be separated.
#[derive(Debug, Default)]
pub struct BufferSink {
    bytes: Vec<u8>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written since the last reset.
    pub fn read_all(&self) -> &[u8] {
        &self.bytes
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    /// Take the contents and leave the sink empty.
    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl io::Write for BufferSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Cloneable handle to a [`BufferSink`] shared between threads.
///
/// Handed to a handler as its mirror writer, it keeps the raw formatted
/// bytes readable by the caller after the entry has been submitted.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<BufferSink>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents as UTF-8, lossy.
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(self.inner.lock().read_all()).into_owned()
    }

    pub fn take(&self) -> Vec<u8> {
        self.inner.lock().drain()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut *self.inner.lock(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
