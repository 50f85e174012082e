pub mod buffer;
pub mod client;
pub mod env;
pub mod formatter;
pub mod handler;
pub mod logger;
pub mod record;
pub mod severity;

pub mod memory_client;
pub mod sink;
pub mod sink_client;

#[cfg(feature = "console")]
pub mod console;

pub mod init;
pub mod layer;

pub use client::{BackendClient, Entry, Payload};
pub use handler::{CaptureHandler, HandlerConfig, HandlerError};
pub use record::{Attr, Level, Record};
pub use severity::Severity;
