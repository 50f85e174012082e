use std::sync::Arc;
use std::time::Instant;

use cloud_log_handler::handler::{CaptureHandler, HandlerConfig};
use cloud_log_handler::logger::Logger;
use cloud_log_handler::memory_client::NoopClient;
use cloud_log_handler::record::Attr;

fn main() {
    let handler = CaptureHandler::new(HandlerConfig::new(Arc::new(NoopClient)));
    let log = Logger::new(handler).with_group("load").with([Attr::new("run", "default")]);

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        if let Err(e) = log.error("default load test error", None, [Attr::new("iteration", i)]) {
            eprintln!("handle failed: {}", e);
        }
    }

    let elapsed = start.elapsed();
    println!("default config: handled {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
