//! Log line parser using serde_json and nom.
//!
//! Lines are tried as self-contained JSON objects first, then against the
//! fixed standard format:
//!
//! ```text
//! 2024-03-05 14:07:09,120 - image_processing - ERROR - [resize.py:42] - Resize failed
//! ```
//!
//! Anything else is unrecognized. Unrecognized lines are expected noise in
//! real log files (exception continuation lines, partial writes) and callers
//! skip them without reporting.

use crate::models::LogRecord;
use nom::{
    bytes::complete::{tag, take_while1, take_while_m_n},
    character::complete::{char, digit1},
    combinator::{map_res, recognize},
    IResult, Parser,
};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while parsing a log line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineParseError {
    /// The line is empty after trimming.
    #[error("Empty line")]
    Empty,

    /// The line is valid JSON but not an object.
    #[error("JSON value is not an object")]
    NotAnObject,

    /// The line matches neither JSON nor the standard format.
    #[error("Unrecognized log line: '{0}'")]
    Unrecognized(String),
}

/// Parses one log line into a record.
///
/// # Errors
///
/// Returns a `LineParseError` if:
/// - The line is empty or whitespace only
/// - The line is JSON but not a JSON object
/// - The line matches neither JSON nor the standard format
///
/// # Examples
///
/// ```
/// use shared::analysis::parse_line;
///
/// let record = parse_line(r#"{"level": "ERROR", "message": "boom", "line": 10}"#).unwrap();
/// assert_eq!(record.level, "error");
/// assert_eq!(record.line, Some(10));
///
/// let record = parse_line(
///     "2024-03-05 14:07:09,120 - api - INFO - [routes.py:7] - Request started",
/// )
/// .unwrap();
/// assert_eq!(record.name.as_deref(), Some("api"));
/// ```
pub fn parse_line(line: &str) -> Result<LogRecord, LineParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(LineParseError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(line) {
        return match value {
            Value::Object(fields) => Ok(record_from_json(&fields)),
            _ => Err(LineParseError::NotAnObject),
        };
    }

    match standard_line(line) {
        Ok((_, record)) => Ok(record),
        Err(_) => Err(LineParseError::Unrecognized(line.to_string())),
    }
}

// ============================================================================
// JSON lines
// ============================================================================

fn record_from_json(fields: &Map<String, Value>) -> LogRecord {
    LogRecord {
        timestamp: text_field(fields, "timestamp"),
        name: text_field(fields, "name"),
        level: text_field(fields, "level")
            .map(|level| level.to_lowercase())
            .unwrap_or_default(),
        file: text_field(fields, "file"),
        line: fields.get("line").and_then(line_number),
        message: text_field(fields, "message"),
        request_id: text_field(fields, "request_id"),
        user_id: text_field(fields, "user_id"),
        duration_ms: fields.get("duration_ms").and_then(number),
        memory_usage: fields.get("memory_usage").and_then(number),
        exception: text_field(fields, "exception"),
    }
}

/// Strings as-is, numbers and booleans in their JSON spelling.
fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn line_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Standard format lines
// ============================================================================

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_name_char(c: char) -> bool {
    is_word_char(c) || c == '.'
}

fn fixed_digits<'a>(
    count: usize,
) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    take_while_m_n(count, count, |c: char| c.is_ascii_digit())
}

/// `YYYY-MM-DD HH:MM:SS,mmm`
fn timestamp(input: &str) -> IResult<&str, &str> {
    let date = (
        fixed_digits(4),
        char('-'),
        fixed_digits(2),
        char('-'),
        fixed_digits(2),
    );
    let time = (
        fixed_digits(2),
        char(':'),
        fixed_digits(2),
        char(':'),
        fixed_digits(2),
        char(','),
        fixed_digits(3),
    );
    recognize((date, char(' '), time)).parse(input)
}

fn standard_line(input: &str) -> IResult<&str, LogRecord> {
    let (input, timestamp) = timestamp(input)?;
    let (input, _) = tag(" - ").parse(input)?;
    let (input, name) = take_while1(is_name_char).parse(input)?;
    let (input, _) = tag(" - ").parse(input)?;
    let (input, level) = take_while1(is_word_char).parse(input)?;
    let (input, _) = tag(" - [").parse(input)?;
    let (input, file) = take_while1(is_name_char).parse(input)?;
    let (input, _) = char(':').parse(input)?;
    let (input, line) = map_res(digit1, str::parse::<u32>).parse(input)?;
    let (message, _) = tag("] - ").parse(input)?;

    let record = LogRecord {
        timestamp: Some(timestamp.to_string()),
        name: Some(name.to_string()),
        level: level.to_lowercase(),
        file: Some(file.to_string()),
        line: Some(line),
        message: Some(message.lines().next().unwrap_or_default().to_string()),
        ..LogRecord::default()
    };
    Ok(("", record))
}
