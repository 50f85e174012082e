use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Importance of a [`Record`].
///
/// Levels are plain integers so callers can define their own in between
/// the well-known ones; a higher value is more severe. The named levels are
/// spaced four apart, matching common structured-logging conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);

    fn base(self) -> (&'static str, Level) {
        if self < Level::INFO {
            ("DEBUG", Level::DEBUG)
        } else if self < Level::WARN {
            ("INFO", Level::INFO)
        } else if self < Level::ERROR {
            ("WARN", Level::WARN)
        } else {
            ("ERROR", Level::ERROR)
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

/// Renders `INFO`, `WARN+2`, `DEBUG-4`, ... relative to the nearest named
/// level at or below the value.
impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, base) = self.base();
        let offset = self.0 - base.0;
        if offset == 0 {
            f.write_str(name)
        } else {
            write!(f, "{name}{offset:+}")
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LevelParseError {
    #[error("unknown level name {0:?}")]
    UnknownName(String),

    #[error("invalid level offset in {0:?}")]
    InvalidOffset(String),
}

impl FromStr for Level {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (name, offset) = match trimmed.find(['+', '-']) {
            Some(idx) => {
                let offset = trimmed[idx..]
                    .parse::<i32>()
                    .map_err(|_| LevelParseError::InvalidOffset(s.to_string()))?;
                (&trimmed[..idx], offset)
            }
            None => (trimmed, 0),
        };

        let base = match name.to_ascii_uppercase().as_str() {
            "DEBUG" => Level::DEBUG,
            "INFO" => Level::INFO,
            "WARN" | "WARNING" => Level::WARN,
            "ERROR" => Level::ERROR,
            _ => return Err(LevelParseError::UnknownName(s.to_string())),
        };
        base.0
            .checked_add(offset)
            .map(Level)
            .ok_or_else(|| LevelParseError::InvalidOffset(s.to_string()))
    }
}

/// Value carried by an [`Attr`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Group(Vec<Attr>),
    Json(serde_json::Value),
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v.into())
            }
        })*
    };
}

value_from! {
    String => Str,
    &str => Str,
    i64 => I64,
    i32 => I64,
    u64 => U64,
    u32 => U64,
    f64 => F64,
    bool => Bool,
    DateTime<Utc> => Time,
    serde_json::Value => Json,
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::U64(v as u64)
    }
}

/// A key/value pair attached to a record or to a handler view.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Attr { key: key.into(), value: value.into() }
    }

    /// Group of attributes rendered as a nested object under `key`.
    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Attr { key: key.into(), value: Value::Group(attrs) }
    }

    /// Attribute under the conventional `err` key holding the error's
    /// display text.
    pub fn error(err: &dyn std::error::Error) -> Self {
        Attr::new("err", err.to_string())
    }
}

/// Code location that produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Source {
    pub function: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// One structured log event.
///
/// Group context is not part of the record: it lives in the formatter a
/// handler view was derived with.
#[derive(Debug, Clone)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub attrs: Vec<Attr>,
    pub source: Option<Source>,
}

impl Record {
    /// Record stamped with the current time and no attributes.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Record {
            time: Utc::now(),
            level,
            message: message.into(),
            attrs: Vec::new(),
            source: None,
        }
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }
}
