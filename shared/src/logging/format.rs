//! Line formatters.
//!
//! Renders a `LogEvent` into one of three encodings:
//!
//! | kind | output |
//! |---|---|
//! | `standard` | `<ts> - <name> - <LEVEL> - [<file>:<line>] - <message>` |
//! | `json` | one-line JSON object |
//! | `simple` | `<LEVEL> - <message>` |

use crate::models::LogEvent;
use serde::{Deserialize, Serialize};

/// Timestamp layout shared by the standard and JSON encodings.
///
/// The analyzer's fixed-grammar fallback expects exactly this layout.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Formatter selection, resolved once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Human-readable line with source location.
    #[default]
    Standard,
    /// One JSON object per line.
    Json,
    /// Level and message only.
    Simple,
}

/// Field layout of a JSON-encoded line.
#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    name: &'a str,
    level: &'static str,
    file: &'a str,
    line: u32,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_usage: Option<f64>,
}

impl FormatKind {
    /// Maps a configured format name to a kind.
    ///
    /// Unrecognized names fall back to `Standard`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::logging::FormatKind;
    ///
    /// assert_eq!(FormatKind::from_name("JSON"), FormatKind::Json);
    /// assert_eq!(FormatKind::from_name("fancy"), FormatKind::Standard);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "simple" => Self::Simple,
            _ => Self::Standard,
        }
    }

    /// Renders an event as a single logical line (without trailing newline).
    #[must_use]
    pub fn format(self, event: &LogEvent) -> String {
        match self {
            Self::Standard => format_standard(event),
            Self::Json => format_json(event),
            Self::Simple => format_simple(event),
        }
    }
}

fn timestamp(event: &LogEvent) -> String {
    event.timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn with_exception(mut line: String, event: &LogEvent) -> String {
    if let Some(exception) = &event.exception {
        line.push('\n');
        line.push_str(exception);
    }
    line
}

fn format_standard(event: &LogEvent) -> String {
    let line = format!(
        "{} - {} - {} - [{}:{}] - {}",
        timestamp(event),
        event.name,
        event.level.label(),
        event.file,
        event.line,
        event.message
    );
    with_exception(line, event)
}

fn format_simple(event: &LogEvent) -> String {
    let line = format!("{} - {}", event.level.label(), event.message);
    with_exception(line, event)
}

fn format_json(event: &LogEvent) -> String {
    let line = JsonLine {
        timestamp: timestamp(event),
        name: &event.name,
        level: event.level.label(),
        file: &event.file,
        line: event.line,
        message: &event.message,
        exception: event.exception.as_deref(),
        request_id: event.request_id.as_deref(),
        user_id: event.user_id.as_deref(),
        duration_ms: event.duration_ms,
        memory_usage: event.memory_usage_mb,
    };
    serde_json::to_string(&line).unwrap_or_else(|_| format_standard(event))
}
