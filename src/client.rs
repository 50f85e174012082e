use crate::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;

/// Error type shared by backend clients and sinks.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Decoded key/value form of one formatted record.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A log entry as submitted to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub payload: Payload,
}

/// Synchronous log-ingestion client the handler submits entries to.
///
/// A client may deliver asynchronously internally, but `flush` must not
/// return until every previously submitted entry is durably written (or
/// has failed). The handler calls `flush` after every `submit`.
pub trait BackendClient: Send + Sync {
    /// Hand one entry to the client. Ownership of the entry moves to it.
    fn submit(&self, entry: Entry) -> Result<(), BoxError>;

    /// Block until everything submitted so far has been written.
    fn flush(&self) -> Result<(), BoxError>;
}
