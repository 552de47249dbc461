//! Named loggers and request-scoped adapters.
//!
//! A `Logger` is a cheap handle pairing a name with the shared context.
//! A `ContextAdapter` additionally stamps a fixed request id and/or user id
//! on everything it emits. Both capture the caller's file and line through
//! `#[track_caller]`, so call sites never pass locations by hand.

use super::context::LoggingContext;
use super::timer::PerformanceTimer;
use crate::models::{LogEvent, LogLevel};
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

/// Renders an error and its source chain as exception text.
#[must_use]
pub fn render_error_chain(error: &dyn std::error::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str("\nCaused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn file_name(location: &Location<'_>) -> String {
    Path::new(location.file())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(location.file())
        .to_string()
}

/// A named logger bound to a `LoggingContext`.
#[derive(Debug, Clone)]
pub struct Logger {
    context: Arc<LoggingContext>,
    name: String,
}

impl Logger {
    /// Creates a logger; usually obtained through `LoggingContext::logger`.
    #[must_use]
    pub fn new(context: Arc<LoggingContext>, name: impl Into<String>) -> Self {
        Self {
            context,
            name: name.into(),
        }
    }

    /// The logger name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The context this logger emits through.
    #[must_use]
    pub fn context(&self) -> &Arc<LoggingContext> {
        &self.context
    }

    /// Returns true if events at `level` from this logger reach any sink.
    #[must_use]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.context.is_enabled(&self.name, level)
    }

    /// Builds an event from this logger located at `location`.
    #[must_use]
    pub fn event_at(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        location: &Location<'_>,
    ) -> LogEvent {
        LogEvent::new(
            self.name.clone(),
            level,
            message,
            file_name(location),
            location.line(),
        )
    }

    /// Emits a fully built event.
    pub fn emit(&self, event: &LogEvent) {
        self.context.emit(event);
    }

    /// Emits a message at `level`.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if self.is_enabled(level) {
            self.emit(&self.event_at(level, message, Location::caller()));
        }
    }

    /// Emits a debug message.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    /// Emits an info message.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Emits a warning message.
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Emits an error message.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Emits a critical message.
    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    /// Emits an error message carrying the rendered error chain.
    #[track_caller]
    pub fn exception(&self, message: impl Into<String>, error: &dyn std::error::Error) {
        if self.is_enabled(LogLevel::Error) {
            let event = self
                .event_at(LogLevel::Error, message, Location::caller())
                .with_exception(render_error_chain(error));
            self.emit(&event);
        }
    }

    /// Wraps this logger with request context.
    #[must_use]
    pub fn with_context(
        &self,
        request_id: Option<String>,
        user_id: Option<String>,
    ) -> ContextAdapter {
        ContextAdapter {
            logger: self.clone(),
            request_id,
            user_id,
        }
    }

    /// Creates a performance timer emitting through this logger.
    #[must_use]
    pub fn timer(&self) -> PerformanceTimer {
        PerformanceTimer::new(self.with_context(None, None))
    }
}

/// A logger that stamps request context on every event.
///
/// Adapters hold nothing but the logger handle and two ids, so creating one
/// per request is cheap.
///
/// # Example
///
/// ```
/// use shared::logging::{FormatKind, InMemorySink, LoggingContext};
/// use shared::models::LogLevel;
/// use std::sync::Arc;
///
/// let sink = InMemorySink::new(LogLevel::Debug, FormatKind::Json);
/// let context = Arc::new(
///     LoggingContext::builder().default_level(LogLevel::Debug).sink(sink.clone()).build(),
/// );
///
/// let request = context.logger("api").with_context(Some("req-42".into()), None);
/// request.info("Request started");
///
/// assert!(sink.lines()[0].contains("\"request_id\":\"req-42\""));
/// ```
#[derive(Debug, Clone)]
pub struct ContextAdapter {
    logger: Logger,
    request_id: Option<String>,
    user_id: Option<String>,
}

impl ContextAdapter {
    /// Creates an adapter for `name` with the given ids.
    #[must_use]
    pub fn new(
        context: &Arc<LoggingContext>,
        name: impl Into<String>,
        request_id: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        context.logger(name).with_context(request_id, user_id)
    }

    /// The wrapped logger.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The request id stamped on events.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// The user id stamped on events.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Adds this adapter's ids to an event.
    #[must_use]
    pub fn decorate(&self, mut event: LogEvent) -> LogEvent {
        if let Some(request_id) = &self.request_id {
            event.request_id = Some(request_id.clone());
        }
        if let Some(user_id) = &self.user_id {
            event.user_id = Some(user_id.clone());
        }
        event
    }

    /// Builds a decorated event located at `location`.
    #[must_use]
    pub fn event_at(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        location: &Location<'_>,
    ) -> LogEvent {
        self.decorate(self.logger.event_at(level, message, location))
    }

    /// Emits a fully built event.
    pub fn emit(&self, event: &LogEvent) {
        self.logger.emit(event);
    }

    /// Emits a message at `level`.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if self.logger.is_enabled(level) {
            self.emit(&self.event_at(level, message, Location::caller()));
        }
    }

    /// Emits a debug message.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    /// Emits an info message.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Emits a warning message.
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Emits an error message.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Emits a critical message.
    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    /// Emits an error message carrying the rendered error chain.
    #[track_caller]
    pub fn exception(&self, message: impl Into<String>, error: &dyn std::error::Error) {
        if self.logger.is_enabled(LogLevel::Error) {
            let event = self
                .event_at(LogLevel::Error, message, Location::caller())
                .with_exception(render_error_chain(error));
            self.emit(&event);
        }
    }

    /// Creates a performance timer carrying this adapter's context.
    #[must_use]
    pub fn timer(&self) -> PerformanceTimer {
        PerformanceTimer::new(self.clone())
    }
}
