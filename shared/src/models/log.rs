//! Log event data model.
//!
//! Defines the `LogLevel` scale and the `LogEvent` structure emitted by the
//! producer side of the pipeline.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Log severity level.
///
/// Each level carries a numeric value (`debug` = 10 … `critical` = 50) so
/// levels can be compared against floors parsed from arbitrary strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational messages.
    Info,
    /// Warning conditions.
    Warning,
    /// Error conditions.
    Error,
    /// Critical conditions.
    Critical,
}

impl LogLevel {
    /// All levels in ascending order.
    pub const ALL: [Self; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];

    /// Returns the numeric value of the level.
    ///
    /// # Example
    ///
    /// ```
    /// use shared::models::LogLevel;
    ///
    /// assert_eq!(LogLevel::Warning.value(), 30);
    /// ```
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Debug => 10,
            Self::Info => 20,
            Self::Warning => 30,
            Self::Error => 40,
            Self::Critical => 50,
        }
    }

    /// Returns the lowercase level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Returns the uppercase label used in rendered log lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Returns true for `error` and `critical`.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// Error returned when a string does not name a log level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown log level: '{0}'. Expected debug, info, warning, error or critical")]
pub struct UnknownLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" | "fatal" => Ok(Self::Critical),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}

/// Maps a level name to its numeric value.
///
/// Names outside the level table map to 0, so they never pass a floor but
/// are still countable by name.
///
/// # Example
///
/// ```
/// use shared::models::level_value;
///
/// assert_eq!(level_value("ERROR"), 40);
/// assert_eq!(level_value("verbose"), 0);
/// ```
#[must_use]
pub fn level_value(name: &str) -> u8 {
    match name.to_ascii_lowercase().as_str() {
        "debug" => 10,
        "info" => 20,
        "warning" => 30,
        "error" => 40,
        "critical" => 50,
        _ => 0,
    }
}

/// A single structured log event.
///
/// Events are created at emission time and never mutated afterwards; the
/// builder methods consume and return the event.
///
/// # Example
///
/// ```
/// use shared::models::{LogEvent, LogLevel};
///
/// let event = LogEvent::new("main", LogLevel::Info, "Request started", "main.rs", 42)
///     .with_request_id("req-1")
///     .with_duration_ms(12.5);
///
/// assert_eq!(event.request_id.as_deref(), Some("req-1"));
/// assert_eq!(event.duration_ms, Some(12.5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// When the event was emitted.
    pub timestamp: DateTime<Local>,
    /// Name of the logger that emitted the event.
    pub name: String,
    /// Severity level.
    pub level: LogLevel,
    /// Source file name of the call site.
    pub file: String,
    /// Source line of the call site.
    pub line: u32,
    /// The log message.
    pub message: String,
    /// Request correlation id.
    pub request_id: Option<String>,
    /// User id.
    pub user_id: Option<String>,
    /// Duration of a timed operation in milliseconds.
    pub duration_ms: Option<f64>,
    /// Resident memory of the process in megabytes.
    pub memory_usage_mb: Option<f64>,
    /// Rendered exception or error chain.
    pub exception: Option<String>,
}

impl LogEvent {
    /// Creates a new event stamped with the current local time.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            name: name.into(),
            level,
            file: file.into(),
            line,
            message: message.into(),
            request_id: None,
            user_id: None,
            duration_ms: None,
            memory_usage_mb: None,
            exception: None,
        }
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the request correlation id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the operation duration in milliseconds.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the memory usage in megabytes.
    #[must_use]
    pub fn with_memory_usage_mb(mut self, memory_usage_mb: f64) -> Self {
        self.memory_usage_mb = Some(memory_usage_mb);
        self
    }

    /// Attaches exception text.
    #[must_use]
    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }
}
