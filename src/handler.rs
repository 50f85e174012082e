use crate::buffer::BufferSink;
use crate::client::{BackendClient, BoxError, Entry, Payload};
use crate::formatter::{Formatter, HandlerOptions, JsonFormatter};
use crate::record::{Attr, Level, Record};
use crate::severity::Severity;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::warn;

/// Error returned by [`CaptureHandler::handle`]. No entry is submitted when
/// any of these is returned.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    /// The formatter failed to serialize the record.
    #[error("formatting record: {0}")]
    Format(#[source] io::Error),

    /// Reading the captured bytes or copying them to the mirror failed.
    #[error("capturing formatted record: {0}")]
    Io(#[source] io::Error),

    /// The formatter produced bytes that are not a JSON object.
    #[error("decoding formatted record: {0}")]
    Decode(#[source] serde_json::Error),

    /// The backend client rejected the entry or failed to flush it.
    #[error("backend client: {0}")]
    Backend(#[source] BoxError),
}

/// Construction parameters for a [`CaptureHandler`] using the built-in
/// [`JsonFormatter`].
///
/// **Fields**
/// - `client`: backend the entries are submitted to.
/// - `mirror`: optional writer receiving a copy of every formatted record,
///   e.g. a [`SharedBuffer`](crate::buffer::SharedBuffer) the caller keeps
///   reading from after submission.
/// - `options`: formatter options; `None` uses [`HandlerOptions::default`].
pub struct HandlerConfig {
    pub client: Arc<dyn BackendClient>,
    pub mirror: Option<Box<dyn Write + Send>>,
    pub options: Option<HandlerOptions>,
}

impl HandlerConfig {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        HandlerConfig { client, mirror: None, options: None }
    }

    pub fn mirror(mut self, writer: impl Write + Send + 'static) -> Self {
        self.mirror = Some(Box::new(writer));
        self
    }

    pub fn options(mut self, options: HandlerOptions) -> Self {
        self.options = Some(options);
        self
    }
}

struct Capture {
    buffer: BufferSink,
    mirror: Option<Box<dyn Write + Send>>,
}

/// State shared by every view derived from one handler.
struct Shared {
    capture: Mutex<Capture>,
    client: Arc<dyn BackendClient>,
}

/// Handler that captures a formatter's output and forwards it to a
/// [`BackendClient`] as a flushed [`Entry`].
///
/// Each `handle` call formats the record into an internal buffer, drains
/// it, decodes the bytes into a [`Payload`], maps the level to a
/// [`Severity`], submits the entry and flushes the client before
/// returning. One mutex, shared by all views obtained through
/// [`with_attrs`](Self::with_attrs) and [`with_group`](Self::with_group),
/// serializes that sequence.
pub struct CaptureHandler<F: Formatter = JsonFormatter> {
    formatter: F,
    shared: Arc<Shared>,
}

impl<F: Formatter> Clone for CaptureHandler<F> {
    fn clone(&self) -> Self {
        CaptureHandler {
            formatter: self.formatter.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl CaptureHandler<JsonFormatter> {
    pub fn new(config: HandlerConfig) -> Self {
        let formatter = JsonFormatter::new(config.options.unwrap_or_default());
        CaptureHandler::with_formatter(formatter, config.client, config.mirror)
    }
}

impl<F: Formatter> CaptureHandler<F> {
    /// Build a handler around any [`Formatter`] whose output is a JSON
    /// object.
    pub fn with_formatter(
        formatter: F,
        client: Arc<dyn BackendClient>,
        mirror: Option<Box<dyn Write + Send>>,
    ) -> Self {
        CaptureHandler {
            formatter,
            shared: Arc::new(Shared {
                capture: Mutex::new(Capture { buffer: BufferSink::new(), mirror }),
                client,
            }),
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.formatter.enabled(level)
    }

    /// Format, decode, submit and flush one record.
    ///
    /// Records below the formatter's minimum level are ignored and return
    /// `Ok(())` without touching the buffer or the client.
    pub fn handle(&self, record: &Record) -> Result<(), HandlerError> {
        if !self.enabled(record.level) {
            return Ok(());
        }

        let result = self.capture_and_submit(record);
        // Reported after the lock is released.
        if let Err(HandlerError::Decode(e)) = &result {
            warn!(error = %e, "formatted record is not a JSON object");
        }
        result
    }

    fn capture_and_submit(&self, record: &Record) -> Result<(), HandlerError> {
        let mut capture = self.shared.capture.lock();

        let formatted = self.formatter.format(record, &mut capture.buffer);
        // Drain before looking at the outcome so no bytes survive into the
        // next call.
        let bytes = capture.buffer.drain();
        formatted.map_err(HandlerError::Format)?;

        if let Some(mirror) = capture.mirror.as_mut() {
            mirror.write_all(&bytes).map_err(HandlerError::Io)?;
        }

        let payload: Payload = serde_json::from_slice(&bytes).map_err(HandlerError::Decode)?;

        let entry = Entry {
            timestamp: record.time,
            severity: Severity::from(record.level),
            payload,
        };

        let client = &self.shared.client;
        client.submit(entry).map_err(HandlerError::Backend)?;
        client.flush().map_err(HandlerError::Backend)
    }

    /// View whose formatter additionally carries `attrs`; shares the
    /// buffer, mirror and client with `self`.
    pub fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        if attrs.is_empty() {
            return self.clone();
        }
        CaptureHandler {
            formatter: self.formatter.with_attrs(attrs),
            shared: Arc::clone(&self.shared),
        }
    }

    /// View that nests subsequent attributes under `name`. An empty name
    /// yields an equivalent view.
    pub fn with_group(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }
        CaptureHandler {
            formatter: self.formatter.with_group(name),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Bytes currently held by the capture buffer. Zero whenever no
    /// `handle` call is in progress.
    pub fn buffered_len(&self) -> usize {
        self.shared.capture.lock().buffer.len()
    }
}
