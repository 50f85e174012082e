use crate::client::{BackendClient, BoxError, Entry};
use crate::sink::LogSink;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::instrument::WithSubscriber;
use tracing::subscriber::NoSubscriber;
use tracing::{debug, warn};

/// Configuration of a [`SinkClient`].
///
/// **Fields**
/// - `channel_buffer`: maximum number of queued commands before `submit`
///   blocks the caller.
/// - `batch_size`: entries accumulated before the task delivers eagerly.
/// - `flush_interval`: idle time after which a partial batch is delivered.
/// - `max_retries`: retries per batch before its remaining entries are
///   dropped and the failure reported.
/// - `initial_backoff` / `max_backoff`: exponential backoff bounds between
///   retries.
#[derive(Clone, Debug)]
pub struct SinkClientConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for SinkClientConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl SinkClientConfig {
    // Enforce minimal thresholds to avoid degenerate configs.
    fn clamped(mut self) -> Self {
        self.channel_buffer = self.channel_buffer.max(16);
        self.batch_size = self.batch_size.max(1);
        self.flush_interval = self.flush_interval.max(Duration::from_millis(10));
        self.initial_backoff = self.initial_backoff.max(Duration::from_millis(1));
        self.max_backoff = self.max_backoff.max(self.initial_backoff);
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("sink client background task has stopped")]
    Closed,

    #[error("flush acknowledgement was dropped before completion")]
    FlushLost,

    #[error("cannot block inside a current-thread Tokio runtime")]
    CurrentThreadRuntime,
}

/// Run `f`, which blocks the calling thread, from any context.
///
/// Inside a multi-thread runtime the worker is handed off with
/// `block_in_place`; a current-thread runtime cannot be blocked at all.
fn run_blocking<T>(f: impl FnOnce() -> T) -> Result<T, ClientError> {
    match Handle::try_current() {
        Err(_) => Ok(f()),
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::MultiThread => Ok(tokio::task::block_in_place(f)),
            _ => Err(ClientError::CurrentThreadRuntime),
        },
    }
}

enum Command {
    Deliver(Entry),
    Flush(oneshot::Sender<Result<(), BoxError>>),
}

/// [`BackendClient`] that hands entries to an asynchronous [`LogSink`].
///
/// Entries travel over a bounded channel to a background task on the
/// given Tokio runtime, which batches them and delivers with retries.
/// `flush` blocks the calling thread until the task has delivered every
/// queued entry and flushed the sink.
///
/// `submit` and `flush` block the current thread. Called from a task on a
/// multi-thread runtime they use `block_in_place`; on a current-thread
/// runtime they fail with [`ClientError::CurrentThreadRuntime`].
///
/// The delivery task runs without a `tracing` subscriber: events a sink
/// emits while sending would otherwise come back into a capturing layer
/// that is waiting on this very task.
pub struct SinkClient {
    sender: mpsc::Sender<Command>,
    /// Entries accepted by `submit`.
    pub submitted: Arc<AtomicU64>,
    /// Entries the sink acknowledged.
    pub delivered: Arc<AtomicU64>,
    /// Entries dropped after exhausting retries.
    pub failed: Arc<AtomicU64>,
}

impl SinkClient {
    /// Create a client and spawn its delivery task on `runtime`.
    ///
    /// The task ends once the client is dropped and the queue is drained.
    pub fn new(
        sink: Arc<dyn LogSink>,
        config: SinkClientConfig,
        runtime: &Handle,
    ) -> (Self, JoinHandle<()>) {
        let config = config.clamped();
        let (tx, rx) = mpsc::channel::<Command>(config.channel_buffer);

        let submitted = Arc::new(AtomicU64::new(0));
        let delivered = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            sink,
            batch: Vec::with_capacity(config.batch_size),
            config,
            delivered: Arc::clone(&delivered),
            failed: Arc::clone(&failed),
        };
        let handle = runtime.spawn(worker.run(rx).with_subscriber(NoSubscriber::default()));

        (
            Self {
                sender: tx,
                submitted,
                delivered,
                failed,
            },
            handle,
        )
    }
}

impl BackendClient for SinkClient {
    fn submit(&self, entry: Entry) -> Result<(), BoxError> {
        run_blocking(|| self.sender.blocking_send(Command::Deliver(entry)))?
            .map_err(|_| ClientError::Closed)?;
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush(&self) -> Result<(), BoxError> {
        let (ack, done) = oneshot::channel();
        run_blocking(|| {
            self.sender
                .blocking_send(Command::Flush(ack))
                .map_err(|_| ClientError::Closed)?;
            done.blocking_recv().map_err(|_| ClientError::FlushLost)
        })??
    }
}

struct Worker {
    sink: Arc<dyn LogSink>,
    batch: Vec<Entry>,
    config: SinkClientConfig,
    delivered: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Deliver(entry)) => {
                        self.batch.push(entry);
                        if self.batch.len() >= self.config.batch_size {
                            if let Err(e) = self.deliver().await {
                                warn!(error = %e, "error sending log batch");
                            }
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        let result = match self.deliver().await {
                            Ok(()) => self.sink.flush().await,
                            Err(e) => Err(e),
                        };
                        // The flushing caller may have given up waiting.
                        let _ = ack.send(result);
                    }
                    None => {
                        if let Err(e) = self.deliver().await {
                            warn!(error = %e, "error delivering final log batch");
                        }
                        debug!("sink client channel closed, delivery task exiting");
                        break;
                    }
                },
                _ = sleep(self.config.flush_interval) => {
                    if !self.batch.is_empty() {
                        if let Err(e) = self.deliver().await {
                            warn!(error = %e, "error flushing log batch");
                        }
                    }
                }
            }
        }
    }

    /// Deliver the current batch in order, retrying the failed entry with
    /// exponential backoff. Entries already acknowledged are never resent.
    async fn deliver(&mut self) -> Result<(), BoxError> {
        let mut backoff = self.config.initial_backoff;
        let mut retries = 0;
        let mut sent = 0;

        while sent < self.batch.len() {
            match self.sink.send(&self.batch[sent]).await {
                Ok(()) => {
                    sent += 1;
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) if retries < self.config.max_retries => {
                    retries += 1;
                    warn!(error = %e, attempt = retries, "log sink send failed, retrying in {:?}", backoff);
                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.config.max_backoff);
                }
                Err(e) => {
                    let dropped = (self.batch.len() - sent) as u64;
                    self.failed.fetch_add(dropped, Ordering::Relaxed);
                    self.batch.clear();
                    return Err(e);
                }
            }
        }

        self.batch.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Entry>>,
        flushes: AtomicU64,
        failures_left: AtomicU32,
        always_fail: bool,
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        async fn send(&self, entry: &Entry) -> Result<(), BoxError> {
            if self.always_fail {
                return Err("backend down".into());
            }
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err("transient".into());
            }
            self.sent.lock().push(entry.clone());
            Ok(())
        }

        async fn flush(&self) -> Result<(), BoxError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap()
    }

    fn entry(n: i64) -> Entry {
        let mut payload = serde_json::Map::new();
        payload.insert("n".into(), n.into());
        Entry { timestamp: Utc::now(), severity: Severity::Info, payload }
    }

    fn quiet_config() -> SinkClientConfig {
        SinkClientConfig {
            batch_size: 100,
            flush_interval: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            ..SinkClientConfig::default()
        }
    }

    #[test]
    fn flush_delivers_all_queued_entries() {
        let rt = runtime();
        let sink = Arc::new(RecordingSink::default());
        let (client, _task) = SinkClient::new(sink.clone(), quiet_config(), rt.handle());

        for n in 0..3 {
            client.submit(entry(n)).unwrap();
        }
        client.flush().unwrap();

        let sent = sink.sent.lock().clone();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].payload["n"], 2);
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(client.submitted.load(Ordering::Relaxed), 3);
        assert_eq!(client.delivered.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn transient_failures_are_retried_without_duplicates() {
        let rt = runtime();
        let sink = Arc::new(RecordingSink { failures_left: AtomicU32::new(2), ..Default::default() });
        let (client, _task) = SinkClient::new(sink.clone(), quiet_config(), rt.handle());

        client.submit(entry(1)).unwrap();
        client.submit(entry(2)).unwrap();
        client.flush().unwrap();

        assert_eq!(sink.sent.lock().len(), 2);
        assert_eq!(client.failed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn exhausted_retries_fail_the_flush() {
        let rt = runtime();
        let sink = Arc::new(RecordingSink { always_fail: true, ..Default::default() });
        let config = SinkClientConfig { max_retries: 1, ..quiet_config() };
        let (client, _task) = SinkClient::new(sink.clone(), config, rt.handle());

        client.submit(entry(1)).unwrap();
        let err = client.flush().unwrap_err();
        assert_eq!(err.to_string(), "backend down");
        assert_eq!(client.failed.load(Ordering::Relaxed), 1);
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 0);

        // The failed batch was dropped; later flushes start clean.
        client.flush().unwrap();
    }

    #[test]
    fn submit_and_flush_work_inside_multi_thread_runtime() {
        let rt = runtime();
        let sink = Arc::new(RecordingSink::default());
        let (client, _task) = SinkClient::new(sink.clone(), quiet_config(), rt.handle());

        rt.block_on(async {
            client.submit(entry(1)).unwrap();
            client.flush().unwrap();
        });
        let spawned = rt.spawn({
            let client = Arc::new(client);
            async move {
                client.submit(entry(2))?;
                client.flush()
            }
        });
        rt.block_on(spawned).unwrap().unwrap();

        assert_eq!(sink.sent.lock().len(), 2);
    }

    #[test]
    fn current_thread_runtime_is_rejected_without_panicking() {
        let rt = runtime();
        let sink = Arc::new(RecordingSink::default());
        let (client, _task) = SinkClient::new(sink.clone(), quiet_config(), rt.handle());

        let local = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = local.block_on(async { client.submit(entry(1)) }).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::CurrentThreadRuntime)
        ));
        assert!(local.block_on(async { client.flush() }).is_err());
        assert_eq!(client.submitted.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn full_batch_is_delivered_without_flush() {
        let rt = runtime();
        let sink = Arc::new(RecordingSink::default());
        let config = SinkClientConfig { batch_size: 2, ..quiet_config() };
        let (client, _task) = SinkClient::new(sink.clone(), config, rt.handle());

        client.submit(entry(1)).unwrap();
        client.submit(entry(2)).unwrap();
        // A flush is processed after both entries, so the batch is already out.
        client.flush().unwrap();
        assert_eq!(sink.sent.lock().len(), 2);
        assert_eq!(client.delivered.load(Ordering::Relaxed), 2);
    }
}
