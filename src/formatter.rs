use crate::env;
use crate::record::{Attr, Level, Record, Value};
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value as Json};
use std::io;

/// Serializer that turns a [`Record`] into bytes for the capturing handler.
///
/// A formatter value carries its accumulated attribute and group context;
/// `with_attrs` and `with_group` return an extended copy and leave `self`
/// untouched, so views derived from one handler never observe each other.
pub trait Formatter: Clone + Send + Sync + 'static {
    /// Whether records at `level` should be formatted at all.
    fn enabled(&self, level: Level) -> bool;

    /// Write exactly one serialized record to `out`.
    fn format(&self, record: &Record, out: &mut dyn io::Write) -> io::Result<()>;

    fn with_attrs(&self, attrs: Vec<Attr>) -> Self;

    fn with_group(&self, name: &str) -> Self;
}

/// Options shared by the built-in formatter.
///
/// **Fields**
/// - `level`: minimum level that is formatted; records below are dropped.
/// - `add_source`: emit a `source` object with function, file and line
///   when the record carries a [`Source`](crate::record::Source).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandlerOptions {
    pub level: Level,
    pub add_source: bool,
}

impl HandlerOptions {
    /// Read options from the `CLOUD_LOG_*` environment variables, falling
    /// back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = HandlerOptions::default();
        let level = std::env::var(env::CLOUD_LOG_LEVEL_ENV)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(defaults.level);
        let add_source = env::env_flag(env::CLOUD_LOG_ADD_SOURCE_ENV, defaults.add_source);
        HandlerOptions { level, add_source }
    }
}

#[derive(Debug, Clone)]
struct Frame {
    name: String,
    attrs: Vec<Attr>,
}

/// Formatter writing one JSON object per record followed by a newline.
///
/// The object starts with `time`, `level`, optional `source` and `msg`;
/// attributes follow, nested under the groups that were open when they were
/// added. Groups that end up empty are omitted.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    options: HandlerOptions,
    /// `frames[0]` is the unnamed top level; every later frame is a group.
    frames: Vec<Frame>,
}

impl JsonFormatter {
    pub fn new(options: HandlerOptions) -> Self {
        JsonFormatter {
            options,
            frames: vec![Frame { name: String::new(), attrs: Vec::new() }],
        }
    }

    fn render_frame(&self, idx: usize, record: &Record) -> io::Result<Map<String, Json>> {
        let frame = &self.frames[idx];
        let mut map = Map::new();
        for attr in &frame.attrs {
            insert_attr(&mut map, attr)?;
        }

        if idx + 1 == self.frames.len() {
            for attr in &record.attrs {
                insert_attr(&mut map, attr)?;
            }
        } else {
            let child = self.render_frame(idx + 1, record)?;
            if !child.is_empty() {
                map.insert(self.frames[idx + 1].name.clone(), Json::Object(child));
            }
        }
        Ok(map)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        JsonFormatter::new(HandlerOptions::default())
    }
}

impl Formatter for JsonFormatter {
    fn enabled(&self, level: Level) -> bool {
        level >= self.options.level
    }

    fn format(&self, record: &Record, out: &mut dyn io::Write) -> io::Result<()> {
        let mut object = Map::new();
        object.insert(
            "time".into(),
            Json::String(record.time.to_rfc3339_opts(SecondsFormat::Nanos, true)),
        );
        object.insert("level".into(), Json::String(record.level.to_string()));

        if self.options.add_source {
            if let Some(source) = &record.source {
                let mut src = Map::new();
                if let Some(function) = &source.function {
                    src.insert("function".into(), Json::String(function.clone()));
                }
                if let Some(file) = &source.file {
                    src.insert("file".into(), Json::String(file.clone()));
                }
                if let Some(line) = source.line {
                    src.insert("line".into(), Json::from(line));
                }
                object.insert("source".into(), Json::Object(src));
            }
        }

        object.insert("msg".into(), Json::String(record.message.clone()));
        object.extend(self.render_frame(0, record)?);

        serde_json::to_writer(&mut *out, &Json::Object(object))?;
        out.write_all(b"\n")
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        let mut next = self.clone();
        if let Some(frame) = next.frames.last_mut() {
            frame.attrs.extend(attrs);
        }
        next
    }

    fn with_group(&self, name: &str) -> Self {
        let mut next = self.clone();
        if !name.is_empty() {
            next.frames.push(Frame { name: name.to_string(), attrs: Vec::new() });
        }
        next
    }
}

fn insert_attr(map: &mut Map<String, Json>, attr: &Attr) -> io::Result<()> {
    match &attr.value {
        Value::Group(members) => {
            let mut nested = Map::new();
            for member in members {
                insert_attr(&mut nested, member)?;
            }
            if nested.is_empty() {
                return Ok(());
            }
            // An unnamed group is inlined into its parent.
            if attr.key.is_empty() {
                map.extend(nested);
            } else {
                map.insert(attr.key.clone(), Json::Object(nested));
            }
        }
        value => {
            map.insert(attr.key.clone(), to_json(&attr.key, value)?);
        }
    }
    Ok(())
}

fn to_json(key: &str, value: &Value) -> io::Result<Json> {
    Ok(match value {
        Value::Str(s) => Json::String(s.clone()),
        Value::I64(n) => Json::from(*n),
        Value::U64(n) => Json::from(*n),
        Value::F64(f) => Number::from_f64(*f).map(Json::Number).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("attribute {key:?}: unsupported float value {f}"),
            )
        })?,
        Value::Bool(b) => Json::Bool(*b),
        Value::Time(t) => Json::String(t.to_rfc3339_opts(SecondsFormat::Nanos, true)),
        Value::Json(v) => v.clone(),
        Value::Group(_) => unreachable!("groups are expanded by insert_attr"),
    })
}
