//! Offline log analysis.
//!
//! Reads the files written by the [`logging`](crate::logging) module back
//! and summarizes them:
//!
//! - [`discovery`] - Finds recent log files in a directory
//! - [`parser`] - Decodes JSON and standard-format lines
//! - [`aggregate`] - Folds records into counters, errors, and timings
//! - [`alerts`] - Evaluates error-count and slow-operation alerts
//! - [`report`] - Renders the result as text or JSON
//!
//! # Example
//!
//! ```
//! use shared::analysis::{evaluate_alerts, render_text, AnalysisOptions, LogAggregator};
//! use shared::models::LogLevel;
//!
//! let mut aggregator = LogAggregator::new(AnalysisOptions::new(LogLevel::Warning));
//! aggregator.ingest_line(r#"{"level": "info", "message": "ok"}"#);
//! aggregator.ingest_line(r#"{"level": "error", "message": "boom", "file": "x.py", "line": 10}"#);
//!
//! let report = aggregator.finish();
//! assert_eq!(report.total_logs, 2);
//! assert!(render_text(&report).contains("1. N/A - x.py:10"));
//! assert_eq!(evaluate_alerts(&report, 1).len(), 1);
//! ```

pub mod aggregate;
pub mod alerts;
pub mod discovery;
pub mod parser;
pub mod report;

pub use aggregate::{
    analyze_file, analyze_files, extract_operation, AnalysisError, AnalysisOptions,
    AnalysisReport, ErrorRecord, LogAggregator, OperationStats,
};
pub use alerts::{evaluate_alerts, Alert, SLOW_OPERATION_THRESHOLD_MS};
pub use discovery::{discover_log_files, discover_modified_since, is_log_file_name, DiscoveryError};
pub use parser::{parse_line, LineParseError};
pub use report::{format_ms, render_json, render_text, MAX_LISTED_ERRORS, MAX_LISTED_OPERATIONS};
