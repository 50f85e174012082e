use crate::formatter::{Formatter, JsonFormatter};
use crate::handler::CaptureHandler;
use crate::record::{Attr, Level, Record, Source, Value};
use chrono::Utc;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::field::{Field, Visit};
use tracing::span;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`Record`]s and
/// passes them through a [`CaptureHandler`].
///
/// Every span enclosing an event becomes a group named after the span,
/// holding the span's recorded fields; the event's own fields land in the
/// innermost group. Events emitted by this crate are skipped so handler
/// diagnostics never feed back into the handler.
pub struct CaptureLayer<F: Formatter = JsonFormatter> {
    handler: CaptureHandler<F>,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events the handler submitted successfully.
    pub handled_events: Arc<AtomicU64>,
    /// Events the handler returned an error for.
    pub failed_events: Arc<AtomicU64>,
}

impl<F: Formatter> CaptureLayer<F> {
    pub fn new(handler: CaptureHandler<F>) -> Self {
        CaptureLayer {
            handler,
            total_events: Arc::new(AtomicU64::new(0)),
            handled_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Maps `tracing` levels onto record levels; TRACE sits below DEBUG.
pub fn level_from_tracing(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE => Level(Level::DEBUG.0 - 4),
        tracing::Level::DEBUG => Level::DEBUG,
        tracing::Level::INFO => Level::INFO,
        tracing::Level::WARN => Level::WARN,
        tracing::Level::ERROR => Level::ERROR,
    }
}

/// Fields recorded on a span, stored in its extensions.
struct SpanAttrs(Vec<Attr>);

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(env!("CARGO_CRATE_NAME"))
        .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
}

impl<S, F> Layer<S> for CaptureLayer<F>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    F: Formatter,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut fields = Vec::new();
        let mut message = None;
        attrs.record(&mut FieldVisitor { attrs: &mut fields, message: &mut message });
        if let Some(message) = message {
            fields.push(Attr::new("message", message));
        }
        span.extensions_mut().insert(SpanAttrs(fields));
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut fields = Vec::new();
        let mut message = None;
        values.record(&mut FieldVisitor { attrs: &mut fields, message: &mut message });
        if let Some(message) = message {
            fields.push(Attr::new("message", message));
        }

        let mut extensions = span.extensions_mut();
        if let Some(existing) = extensions.get_mut::<SpanAttrs>() {
            existing.0.extend(fields);
            return;
        }
        extensions.insert(SpanAttrs(fields));
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        if is_own_target(meta.target()) {
            return;
        }
        let level = level_from_tracing(meta.level());
        if !self.handler.enabled(level) {
            return;
        }

        let mut attrs = Vec::new();
        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor { attrs: &mut attrs, message: &mut message });

        let mut view = self.handler.clone();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                view = view.with_group(span.name());
                if let Some(fields) = span.extensions().get::<SpanAttrs>() {
                    view = view.with_attrs(fields.0.clone());
                }
            }
        }

        let record = Record {
            time: Utc::now(),
            level,
            message: message.unwrap_or_default(),
            attrs,
            source: Some(Source {
                function: meta.module_path().map(|s| s.to_string()),
                file: meta.file().map(|s| s.to_string()),
                line: meta.line(),
            }),
        };

        match view.handle(&record) {
            Ok(()) => {
                self.handled_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                // Logging through `tracing` here would re-enter this layer.
                eprintln!("cloud log handler dropped event: {}", e);
            }
        }
    }
}

pub struct FieldVisitor<'a> {
    pub attrs: &'a mut Vec<Attr>,
    pub message: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn push(&mut self, field: &Field, value: Value) {
        self.attrs.push(Attr { key: field.name().to_string(), value });
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.push(field, Value::Str(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::U64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Value::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, Value::Str(format!("{:?}", value)));
        }
    }
}
