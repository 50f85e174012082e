use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use cloud_log_handler::client::{BoxError, Entry};
use cloud_log_handler::handler::{CaptureHandler, HandlerConfig};
use cloud_log_handler::layer::CaptureLayer;
use cloud_log_handler::sink::LogSink;
use cloud_log_handler::sink_client::{SinkClient, SinkClientConfig};
use parking_lot::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<Entry>>,
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn send(&self, entry: &Entry) -> Result<(), BoxError> {
        self.sent.lock().push(entry.clone());
        Ok(())
    }
}

#[test]
fn events_inside_multi_thread_runtime_reach_the_sink() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .build()
        .unwrap();
    let sink = Arc::new(RecordingSink::default());
    let (client, _task) = SinkClient::new(sink.clone(), SinkClientConfig::default(), rt.handle());
    let layer = CaptureLayer::new(CaptureHandler::new(HandlerConfig::new(Arc::new(client))));
    let handled = layer.handled_events.clone();
    let failed = layer.failed_events.clone();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        rt.block_on(async {
            tracing::info!(target: "app", request = 7, "inside async");
        });
    });

    assert_eq!(failed.load(Ordering::Relaxed), 0);
    assert_eq!(handled.load(Ordering::Relaxed), 1);
    let sent = sink.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload["msg"], "inside async");
    assert_eq!(sent[0].payload["request"], 7);
}

#[test]
fn events_inside_current_thread_runtime_fail_without_panicking() {
    let delivery = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .unwrap();
    let sink = Arc::new(RecordingSink::default());
    let (client, _task) =
        SinkClient::new(sink.clone(), SinkClientConfig::default(), delivery.handle());
    let layer = CaptureLayer::new(CaptureHandler::new(HandlerConfig::new(Arc::new(client))));
    let handled = layer.handled_events.clone();
    let failed = layer.failed_events.clone();

    let local = tokio::runtime::Builder::new_current_thread().build().unwrap();
    tracing::subscriber::with_default(Registry::default().with(layer), || {
        local.block_on(async {
            tracing::info!(target: "app", "on a current-thread runtime");
        });
    });

    assert_eq!(handled.load(Ordering::Relaxed), 0);
    assert_eq!(failed.load(Ordering::Relaxed), 1);
    assert!(sink.sent.lock().is_empty());
}
