use crate::client::{BoxError, Entry};
use async_trait::async_trait;

/// Asynchronous destination for [`Entry`] values.
///
/// Implementations transport entries to a concrete backend (a vendor SDK,
/// stdout, a database). They are driven by
/// [`SinkClient`](crate::sink_client::SinkClient) from a background task
/// and never awaited on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send a single entry to the underlying backend.
    ///
    /// **Returns**
    /// - `Ok(())` if the entry was accepted by the backend.
    /// - `Err(..)` if the backend failed. The client treats this as a
    ///   transient failure and retries the batch with backoff, up to its
    ///   configured limit.
    async fn send(&self, entry: &Entry) -> Result<(), BoxError>;

    /// Flush any buffered entries, if the backend implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
