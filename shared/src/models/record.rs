//! Decoded log line model.
//!
//! A `LogRecord` is what the analyzer recovers from one line of a log file.
//! Fields are kept as the producer wrote them; nothing is required beyond the
//! line being recognizable.

use super::log::level_value;

/// A log line decoded by the analyzer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRecord {
    /// Timestamp text as written.
    pub timestamp: Option<String>,
    /// Logger name.
    pub name: Option<String>,
    /// Lowercased level name; empty when the line carried none.
    pub level: String,
    /// Source file.
    pub file: Option<String>,
    /// Source line.
    pub line: Option<u32>,
    /// Message text.
    pub message: Option<String>,
    /// Request correlation id.
    pub request_id: Option<String>,
    /// User id.
    pub user_id: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Memory usage in megabytes.
    pub memory_usage: Option<f64>,
    /// Exception text.
    pub exception: Option<String>,
}

impl LogRecord {
    /// Numeric level value, 0 for unrecognized level names.
    #[must_use]
    pub fn level_value(&self) -> u8 {
        level_value(&self.level)
    }

    /// Returns true for `error` and `critical` records.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level_value() >= 40
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_level_value() {
        let record = LogRecord {
            level: "error".to_string(),
            ..LogRecord::default()
        };
        assert_eq!(record.level_value(), 40);
        assert!(record.is_error());
    }

    #[test]
    fn test_record_unknown_level() {
        let record = LogRecord {
            level: "notice".to_string(),
            ..LogRecord::default()
        };
        assert_eq!(record.level_value(), 0);
        assert!(!record.is_error());
    }
}
