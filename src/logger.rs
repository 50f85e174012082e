use crate::formatter::{Formatter, JsonFormatter};
use crate::handler::{CaptureHandler, HandlerError};
use crate::record::{Attr, Level, Record};

/// Front-end over a [`CaptureHandler`].
///
/// ```no_run
/// use std::sync::Arc;
/// use cloud_log_handler::handler::{CaptureHandler, HandlerConfig};
/// use cloud_log_handler::logger::Logger;
/// use cloud_log_handler::memory_client::MemoryClient;
/// use cloud_log_handler::record::Attr;
///
/// let client = Arc::new(MemoryClient::new());
/// let log = Logger::new(CaptureHandler::new(HandlerConfig::new(client)));
/// log.with_group("my_app")
///     .with([Attr::new("key1", "value1")])
///     .info("started", [])
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct Logger<F: Formatter = JsonFormatter> {
    handler: CaptureHandler<F>,
}

impl<F: Formatter> Logger<F> {
    pub fn new(handler: CaptureHandler<F>) -> Self {
        Logger { handler }
    }

    pub fn handler(&self) -> &CaptureHandler<F> {
        &self.handler
    }

    /// Logger whose records all carry `attrs`.
    pub fn with(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        Logger { handler: self.handler.with_attrs(attrs.into_iter().collect()) }
    }

    /// Logger nesting subsequent attributes under `name`.
    pub fn with_group(&self, name: &str) -> Self {
        Logger { handler: self.handler.with_group(name) }
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    /// Build a record at `level` and hand it to the handler if enabled.
    pub fn log(
        &self,
        level: Level,
        message: &str,
        attrs: impl IntoIterator<Item = Attr>,
    ) -> Result<(), HandlerError> {
        if !self.enabled(level) {
            return Ok(());
        }
        let record = Record::new(level, message).with_attrs(attrs);
        self.handler.handle(&record)
    }

    pub fn debug(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) -> Result<(), HandlerError> {
        self.log(Level::DEBUG, message, attrs)
    }

    pub fn info(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) -> Result<(), HandlerError> {
        self.log(Level::INFO, message, attrs)
    }

    pub fn warn(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) -> Result<(), HandlerError> {
        self.log(Level::WARN, message, attrs)
    }

    /// Log at ERROR with `err` attached under the `err` key.
    pub fn error(
        &self,
        message: &str,
        err: Option<&dyn std::error::Error>,
        attrs: impl IntoIterator<Item = Attr>,
    ) -> Result<(), HandlerError> {
        let attrs = attrs.into_iter().chain(err.map(Attr::error));
        self.log(Level::ERROR, message, attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerConfig;
    use crate::memory_client::MemoryClient;
    use std::sync::Arc;

    #[test]
    fn error_attaches_err_after_attrs() {
        let client = Arc::new(MemoryClient::new());
        let log = Logger::new(CaptureHandler::new(HandlerConfig::new(client.clone())));
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");

        log.error("write failed", Some(&err), [Attr::new("path", "/tmp/x")]).unwrap();

        let payload = &client.entries()[0].payload;
        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        assert_eq!(keys, ["time", "level", "msg", "path", "err"]);
        assert_eq!(payload["err"], "disk gone");
    }

    #[test]
    fn disabled_levels_skip_the_handler() {
        let client = Arc::new(MemoryClient::new());
        let log = Logger::new(CaptureHandler::new(HandlerConfig::new(client.clone())));
        log.debug("noise", []).unwrap();
        assert_eq!(client.flush_count(), 0);
        log.info("signal", []).unwrap();
        assert_eq!(client.flush_count(), 1);
    }
}
