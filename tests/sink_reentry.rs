//! Installs a global subscriber, so it lives in its own test binary.

use std::sync::atomic::Ordering;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use async_trait::async_trait;
use cloud_log_handler::client::{BoxError, Entry};
use cloud_log_handler::handler::{CaptureHandler, HandlerConfig};
use cloud_log_handler::layer::CaptureLayer;
use cloud_log_handler::sink::LogSink;
use cloud_log_handler::sink_client::{SinkClient, SinkClientConfig};
use parking_lot::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Sink whose own SDK logs through `tracing` while sending.
#[derive(Default)]
struct ChattySink {
    sent: Mutex<Vec<Entry>>,
}

#[async_trait]
impl LogSink for ChattySink {
    async fn send(&self, entry: &Entry) -> Result<(), BoxError> {
        tracing::info!(target: "vendor_sdk", "uploading entry");
        self.sent.lock().push(entry.clone());
        Ok(())
    }
}

#[test]
fn sink_logging_during_send_does_not_reenter_the_handler() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .unwrap();
    let sink = Arc::new(ChattySink::default());
    let (client, _task) = SinkClient::new(sink.clone(), SinkClientConfig::default(), rt.handle());
    let layer = CaptureLayer::new(CaptureHandler::new(HandlerConfig::new(Arc::new(client))));
    let handled = layer.handled_events.clone();
    let total = layer.total_events.clone();
    tracing::subscriber::set_global_default(Registry::default().with(layer)).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        tracing::info!(target: "app", "user signed in");
        let _ = done_tx.send(());
    });

    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("logging call did not return");
    assert_eq!(handled.load(Ordering::Relaxed), 1);
    assert_eq!(total.load(Ordering::Relaxed), 1);
    let sent = sink.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload["msg"], "user signed in");
}
