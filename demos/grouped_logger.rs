use std::sync::Arc;

use cloud_log_handler::buffer::SharedBuffer;
use cloud_log_handler::formatter::HandlerOptions;
use cloud_log_handler::handler::{CaptureHandler, HandlerConfig};
use cloud_log_handler::logger::Logger;
use cloud_log_handler::memory_client::MemoryClient;
use cloud_log_handler::record::Attr;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Arc::new(MemoryClient::new());
    let raw = SharedBuffer::new();

    let config = HandlerConfig::new(client.clone())
        .mirror(raw.clone())
        .options(HandlerOptions::from_env());
    let log = Logger::new(CaptureHandler::new(config));

    let app = log.with_group("my_app").with([
        Attr::new("key1", "value1"),
        Attr::new("key2", "value2"),
    ]);

    app.debug("cache warmed", [Attr::new("entries", 1024)])?;
    app.info("listening", [Attr::new("port", 8080)])?;
    let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer went away");
    app.error("oops", Some(&err), [])?;

    print!("{}", String::from_utf8_lossy(&raw.take()));
    for entry in client.entries() {
        println!("{} {}", entry.severity, serde_json::to_string(&entry.payload)?);
    }
    Ok(())
}
