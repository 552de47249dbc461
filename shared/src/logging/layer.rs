//! Bridge from `tracing` events to a `LoggingContext`.
//!
//! Installing a `ContextLayer` lets code instrumented with `tracing` macros
//! write through the configured sinks. The event target becomes the logger
//! name with `::` turned into `.`, and the `request_id`, `user_id`, `duration_ms`, `memory_usage` and
//! `exception` fields map onto the matching record fields.

use super::context::LoggingContext;
use crate::models::{LogEvent, LogLevel};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Maps a `tracing` level onto the five record levels.
#[must_use]
pub fn level_from_tracing(level: Level) -> LogLevel {
    if level == Level::ERROR {
        LogLevel::Error
    } else if level == Level::WARN {
        LogLevel::Warning
    } else if level == Level::INFO {
        LogLevel::Info
    } else {
        LogLevel::Debug
    }
}

/// Turns a `tracing` target into a dotted logger name.
///
/// Module paths such as `app::routes::upload` become `app.routes.upload`,
/// which the standard line format and exact-name overrides both accept.
#[must_use]
pub fn logger_name(target: &str) -> String {
    target.replace("::", ".")
}

/// Collects the known fields of a `tracing` event.
#[derive(Debug, Default)]
struct EventVisitor {
    message: String,
    request_id: Option<String>,
    user_id: Option<String>,
    duration_ms: Option<f64>,
    memory_usage: Option<f64>,
    exception: Option<String>,
}

impl EventVisitor {
    fn record_text(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            "request_id" => self.request_id = Some(value),
            "user_id" => self.user_id = Some(value),
            "exception" => self.exception = Some(value),
            _ => {}
        }
    }

    fn record_number(&mut self, field: &Field, value: f64) {
        match field.name() {
            "duration_ms" => self.duration_ms = Some(value),
            "memory_usage" => self.memory_usage = Some(value),
            _ => self.record_text(field, value.to_string()),
        }
    }
}

impl Visit for EventVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_number(field, value);
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_number(field, value as f64);
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_number(field, value as f64);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.exception = Some(super::adapter::render_error_chain(value));
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field, format!("{value:?}"));
    }
}

/// A `tracing_subscriber` layer that forwards events to a `LoggingContext`.
///
/// # Example
///
/// ```
/// use shared::logging::{ContextLayer, FormatKind, InMemorySink, LoggingContext};
/// use shared::models::LogLevel;
/// use std::sync::Arc;
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let sink = InMemorySink::new(LogLevel::Debug, FormatKind::Simple);
/// let context = Arc::new(
///     LoggingContext::builder().default_level(LogLevel::Info).sink(sink.clone()).build(),
/// );
/// let subscriber = tracing_subscriber::registry().with(ContextLayer::new(context));
///
/// tracing::subscriber::with_default(subscriber, || {
///     tracing::info!(target: "api", "listening");
/// });
///
/// assert_eq!(sink.lines(), vec!["INFO - listening".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct ContextLayer {
    context: Arc<LoggingContext>,
}

impl ContextLayer {
    /// Creates a layer emitting through `context`.
    #[must_use]
    pub fn new(context: Arc<LoggingContext>) -> Self {
        Self { context }
    }
}

impl<S: Subscriber> Layer<S> for ContextLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = level_from_tracing(*metadata.level());
        let name = logger_name(metadata.target());
        if !self.context.is_enabled(&name, level) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let file = metadata
            .file()
            .and_then(|file| Path::new(file).file_name())
            .and_then(|file| file.to_str())
            .unwrap_or("unknown");

        let mut record = LogEvent::new(
            name,
            level,
            visitor.message,
            file,
            metadata.line().unwrap_or(0),
        );
        record.request_id = visitor.request_id;
        record.user_id = visitor.user_id;
        record.duration_ms = visitor.duration_ms;
        record.memory_usage_mb = visitor.memory_usage;
        record.exception = visitor.exception;

        self.context.emit(&record);
    }
}
