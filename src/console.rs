use crate::client::{BoxError, Entry};
use crate::sink::LogSink;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::Write;

/// Sink printing each entry as one JSON line on stdout.
///
/// The line uses the shape log agents pick up from container output:
/// `severity` and `timestamp` next to the payload's own keys. Payload keys
/// that collide with either are written as `payload_severity` and
/// `payload_timestamp`.
#[derive(Clone, Default)]
pub struct ConsoleSink;

const RESERVED_KEYS: [&str; 2] = ["severity", "timestamp"];

impl ConsoleSink {
    fn render(entry: &Entry) -> Result<String, serde_json::Error> {
        let mut line = Map::new();
        line.insert("severity".into(), Value::String(entry.severity.as_str().into()));
        line.insert("timestamp".into(), Value::String(entry.timestamp.to_rfc3339()));
        for (key, value) in &entry.payload {
            let key = if RESERVED_KEYS.contains(&key.as_str()) {
                format!("payload_{key}")
            } else {
                key.clone()
            };
            line.insert(key, value.clone());
        }
        serde_json::to_string(&line)
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    async fn send(&self, entry: &Entry) -> Result<(), BoxError> {
        let line = Self::render(entry)?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), BoxError> {
        std::io::stdout().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use chrono::{TimeZone, Utc};

    #[test]
    fn renders_severity_next_to_payload() {
        let mut payload = serde_json::Map::new();
        payload.insert("msg".into(), "started".into());
        let entry = Entry {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            severity: Severity::Warning,
            payload,
        };
        let line = ConsoleSink::render(&entry).unwrap();
        assert_eq!(
            line,
            "{\"severity\":\"WARNING\",\"timestamp\":\"2024-01-02T03:04:05+00:00\",\"msg\":\"started\"}"
        );
    }

    #[test]
    fn colliding_payload_keys_are_renamed() {
        let mut payload = serde_json::Map::new();
        payload.insert("msg".into(), "retry".into());
        payload.insert("severity".into(), "high".into());
        payload.insert("timestamp".into(), 17.into());
        let entry = Entry {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            severity: Severity::Error,
            payload,
        };
        let line = ConsoleSink::render(&entry).unwrap();
        assert_eq!(
            line,
            "{\"severity\":\"ERROR\",\"timestamp\":\"2024-01-02T03:04:05+00:00\",\"msg\":\"retry\",\"payload_severity\":\"high\",\"payload_timestamp\":17}"
        );
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["severity"], "ERROR");
    }
}
