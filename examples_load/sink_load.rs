use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use cloud_log_handler::client::{BoxError, Entry};
use cloud_log_handler::handler::{CaptureHandler, HandlerConfig};
use cloud_log_handler::logger::Logger;
use cloud_log_handler::record::Attr;
use cloud_log_handler::sink::LogSink;
use cloud_log_handler::sink_client::{SinkClient, SinkClientConfig};
use tokio::time::Duration;

/// Sink that accepts everything, to measure the channel round trip that
/// every flushed `handle` call pays.
struct DiscardSink;

#[async_trait]
impl LogSink for DiscardSink {
    async fn send(&self, _entry: &Entry) -> Result<(), BoxError> {
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .build()?;

    let config = SinkClientConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        ..SinkClientConfig::default()
    };
    let (client, _task) = SinkClient::new(Arc::new(DiscardSink), config, runtime.handle());
    let client = Arc::new(client);

    let log = Logger::new(CaptureHandler::new(HandlerConfig::new(client.clone())));

    let n: u64 = 20_000;
    let start = Instant::now();

    for i in 0..n {
        log.error("sink load test error", None, [Attr::new("iteration", i)])?;
    }

    let elapsed = start.elapsed();
    println!("sink client: handled {} records in {:?} (~{:.0} rec/s), delivered {}",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64(),
        client.delivered.load(Ordering::Relaxed)
    );
    Ok(())
}
