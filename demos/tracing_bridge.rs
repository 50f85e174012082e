use std::sync::Arc;

use cloud_log_handler::formatter::HandlerOptions;
use cloud_log_handler::handler::{CaptureHandler, HandlerConfig};
use cloud_log_handler::init::{init_tracing_with_config, LayerConfig};
use cloud_log_handler::memory_client::MemoryClient;
use tracing::{error, info, info_span};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Arc::new(MemoryClient::new());
    let handler = CaptureHandler::new(
        HandlerConfig::new(client.clone()).options(HandlerOptions { add_source: true, ..HandlerOptions::from_env() }),
    );
    init_tracing_with_config(handler, LayerConfig { enable_stdout: true })?;

    info!("starting service");

    let span = info_span!("request", user_id = 42);
    let _guard = span.enter();
    error!(reason = "invalid password", "authentication failed");

    for entry in client.entries() {
        println!("{} {}", entry.severity, serde_json::to_string(&entry.payload)?);
    }
    Ok(())
}
