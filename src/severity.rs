use crate::record::Level;
use serde::Serialize;
use std::fmt;

/// Backend severity of an [`Entry`](crate::client::Entry).
///
/// This is the log-ingestion backend's own enumeration and is deliberately
/// distinct from the application-side [`Level`]. Numeric codes follow the
/// backend convention of steps of one hundred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Default,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Severity {
    pub fn code(self) -> u16 {
        match self {
            Severity::Default => 0,
            Severity::Debug => 100,
            Severity::Info => 200,
            Severity::Notice => 300,
            Severity::Warning => 400,
            Severity::Error => 500,
            Severity::Critical => 600,
            Severity::Alert => 700,
            Severity::Emergency => 800,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Default => "DEFAULT",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the four named levels have a counterpart; every other level value,
/// including offsets such as `INFO+2`, maps to [`Severity::Default`].
impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::DEBUG => Severity::Debug,
            Level::INFO => Severity::Info,
            Level::WARN => Severity::Warning,
            Level::ERROR => Severity::Error,
            _ => Severity::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn named_levels_map_to_matching_severity() {
        assert_eq!(Severity::from(Level::DEBUG), Severity::Debug);
        assert_eq!(Severity::from(Level::INFO), Severity::Info);
        assert_eq!(Severity::from(Level::WARN), Severity::Warning);
        assert_eq!(Severity::from(Level::ERROR), Severity::Error);
    }

    #[test]
    fn unrecognized_level_maps_to_default() {
        assert_eq!(Severity::from(Level(2)), Severity::Default);
        assert_eq!(Severity::from(Level(-8)), Severity::Default);
    }

    #[test]
    fn serializes_as_upper_case_name() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
        assert_eq!(Severity::Warning.to_string(), "WARNING");
        assert_eq!(Severity::Emergency.code(), 800);
    }

    proptest! {
        #[test]
        fn mapping_is_total(raw in any::<i32>()) {
            let severity = Severity::from(Level(raw));
            let named = [Level::DEBUG, Level::INFO, Level::WARN, Level::ERROR];
            if named.contains(&Level(raw)) {
                prop_assert_ne!(severity, Severity::Default);
            } else {
                prop_assert_eq!(severity, Severity::Default);
            }
        }
    }
}
