use std::sync::Arc;

use cloud_log_handler::client::{BackendClient, BoxError, Entry};
use cloud_log_handler::console::ConsoleSink;
use cloud_log_handler::handler::{CaptureHandler, HandlerConfig};
use cloud_log_handler::logger::Logger;
use cloud_log_handler::record::Attr;
use cloud_log_handler::sink_client::{SinkClient, SinkClientConfig};

/// Example of integrating a completely custom backend by implementing
/// `BackendClient` directly. Imagine this wraps a vendor SDK whose
/// `flush` blocks until the service acknowledged the write.
struct MyCustomDbClient;

impl BackendClient for MyCustomDbClient {
    fn submit(&self, entry: Entry) -> Result<(), BoxError> {
        // Here you would call your own client library for the target DB.
        println!("[my-custom-db] {} {}", entry.severity, serde_json::to_string(&entry.payload)?);
        Ok(())
    }

    fn flush(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let custom = Logger::new(CaptureHandler::new(HandlerConfig::new(Arc::new(MyCustomDbClient))));
    custom.info("custom backend example started", [])?;

    // Asynchronous sinks go through `SinkClient`.
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_time().build()?;
    let (client, _task) = SinkClient::new(Arc::new(ConsoleSink), SinkClientConfig::default(), runtime.handle());
    let console = Logger::new(CaptureHandler::new(HandlerConfig::new(Arc::new(client))));
    console
        .with([Attr::new("db", "my-custom-db")])
        .error("simulated error sent via console sink", None, [])?;
    Ok(())
}
