//! Streaming aggregation of parsed log records.
//!
//! A `LogAggregator` folds records into counters, an error list and
//! per-operation duration samples. Aggregators built independently (one per
//! file) merge in order, so the final report does not depend on how the work
//! was split.

use super::parser::parse_line;
use crate::models::{LogLevel, LogRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while analyzing log files.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A log file could not be opened or read.
    #[error("Error processing log file {path}: {source}")]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A worker task failed before returning.
    #[error("Worker for log file {path} failed: {reason}")]
    Worker {
        /// The file the worker was processing.
        path: PathBuf,
        /// Join failure description.
        reason: String,
    },
}

/// Settings for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Records below this level only count toward the totals.
    pub min_level: LogLevel,
    /// Collect per-operation duration statistics.
    pub include_metrics: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Warning,
            include_metrics: false,
        }
    }
}

impl AnalysisOptions {
    /// Creates options with the given floor and metrics disabled.
    #[must_use]
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
            include_metrics: false,
        }
    }

    /// Enables or disables duration statistics.
    #[must_use]
    pub fn with_metrics(mut self, include_metrics: bool) -> Self {
        self.include_metrics = include_metrics;
        self
    }
}

/// An error or critical record kept in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Timestamp text as written.
    pub timestamp: Option<String>,
    /// Message text.
    pub message: Option<String>,
    /// Source file.
    pub file: Option<String>,
    /// Source line.
    pub line: Option<u32>,
    /// Exception text, when the record carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl From<&LogRecord> for ErrorRecord {
    fn from(record: &LogRecord) -> Self {
        Self {
            timestamp: record.timestamp.clone(),
            message: record.message.clone(),
            file: record.file.clone(),
            line: record.line,
            exception: record.exception.clone(),
        }
    }
}

/// Duration statistics for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    /// Operation name.
    pub operation: String,
    /// Mean duration, rounded to two decimals.
    pub avg_duration_ms: f64,
    /// Longest duration, rounded to two decimals.
    pub max_duration_ms: f64,
    /// Shortest duration, rounded to two decimals.
    pub min_duration_ms: f64,
    /// Number of samples.
    pub count: usize,
}

impl OperationStats {
    /// Computes statistics over `durations`; `None` when there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_samples(operation: impl Into<String>, durations: &[f64]) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }
        let sum: f64 = durations.iter().sum();
        let max = durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = durations.iter().copied().fold(f64::INFINITY, f64::min);

        Some(Self {
            operation: operation.into(),
            avg_duration_ms: round2(sum / durations.len() as f64),
            max_duration_ms: round2(max),
            min_duration_ms: round2(min),
            count: durations.len(),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The finished analysis of a set of log files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Number of recognized lines.
    pub total_logs: u64,
    /// Recognized lines per lowercased level name, regardless of the floor.
    pub logs_by_level: BTreeMap<String, u64>,
    /// Occurrences per request id, over records at or above the floor.
    pub requests: BTreeMap<String, u64>,
    /// Error and critical records at or above the floor, in encounter order.
    pub errors: Vec<ErrorRecord>,
    /// Operations with more than one sample, slowest mean first.
    pub slowest_operations: Vec<OperationStats>,
}

/// Extracts the operation name from a `(operation: <name>)` marker.
///
/// The last marker in the message wins; the name runs up to the next `)`.
///
/// # Examples
///
/// ```
/// use shared::analysis::extract_operation;
///
/// assert_eq!(
///     extract_operation("Resized (operation: resize) - Duration: 12.00ms"),
///     Some("resize")
/// );
/// assert_eq!(extract_operation("no marker here"), None);
/// ```
#[must_use]
pub fn extract_operation(message: &str) -> Option<&str> {
    const MARKER: &str = "(operation: ";
    let start = message.rfind(MARKER)? + MARKER.len();
    let rest = &message[start..];
    let name = rest.split(')').next().unwrap_or(rest);
    (!name.is_empty()).then_some(name)
}

/// Accumulates records into an `AnalysisReport`.
#[derive(Debug, Clone)]
pub struct LogAggregator {
    options: AnalysisOptions,
    total_logs: u64,
    logs_by_level: BTreeMap<String, u64>,
    requests: BTreeMap<String, u64>,
    errors: Vec<ErrorRecord>,
    samples: Vec<(String, Vec<f64>)>,
    sample_index: HashMap<String, usize>,
}

impl LogAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new(options: AnalysisOptions) -> Self {
        Self {
            options,
            total_logs: 0,
            logs_by_level: BTreeMap::new(),
            requests: BTreeMap::new(),
            errors: Vec::new(),
            samples: Vec::new(),
            sample_index: HashMap::new(),
        }
    }

    /// The options this aggregator was created with.
    #[must_use]
    pub fn options(&self) -> AnalysisOptions {
        self.options
    }

    /// Number of records observed so far.
    #[must_use]
    pub fn total_logs(&self) -> u64 {
        self.total_logs
    }

    /// Folds one record into the aggregate.
    pub fn observe(&mut self, record: &LogRecord) {
        self.total_logs += 1;
        *self.logs_by_level.entry(record.level.clone()).or_insert(0) += 1;

        if record.level_value() < self.options.min_level.value() {
            return;
        }

        if let Some(request_id) = &record.request_id {
            *self.requests.entry(request_id.clone()).or_insert(0) += 1;
        }

        if record.is_error() {
            self.errors.push(ErrorRecord::from(record));
        }

        if self.options.include_metrics {
            if let Some(duration) = record.duration_ms {
                if let Some(operation) = record.message.as_deref().and_then(extract_operation) {
                    self.push_sample(operation, duration);
                }
            }
        }
    }

    fn push_sample(&mut self, operation: &str, duration: f64) {
        if let Some(&index) = self.sample_index.get(operation) {
            self.samples[index].1.push(duration);
        } else {
            self.sample_index
                .insert(operation.to_string(), self.samples.len());
            self.samples.push((operation.to_string(), vec![duration]));
        }
    }

    /// Parses and folds one line; returns false if the line was skipped.
    pub fn ingest_line(&mut self, line: &str) -> bool {
        match parse_line(line) {
            Ok(record) => {
                self.observe(&record);
                true
            }
            Err(_) => false,
        }
    }

    /// Folds every line of `reader`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails, including on invalid UTF-8.
    pub fn ingest_reader<R: BufRead>(&mut self, reader: R) -> io::Result<()> {
        for line in reader.lines() {
            self.ingest_line(&line?);
        }
        Ok(())
    }

    /// Appends another aggregator's state after this one's.
    ///
    /// Counters add up, error and sample lists concatenate, and operations
    /// first seen in `other` keep their relative order after ours.
    pub fn merge(&mut self, other: LogAggregator) {
        self.total_logs += other.total_logs;
        for (level, count) in other.logs_by_level {
            *self.logs_by_level.entry(level).or_insert(0) += count;
        }
        for (request_id, count) in other.requests {
            *self.requests.entry(request_id).or_insert(0) += count;
        }
        self.errors.extend(other.errors);
        for (operation, durations) in other.samples {
            if let Some(&index) = self.sample_index.get(&operation) {
                self.samples[index].1.extend(durations);
            } else {
                self.sample_index.insert(operation.clone(), self.samples.len());
                self.samples.push((operation, durations));
            }
        }
    }

    /// Finishes the aggregate into a report.
    ///
    /// Operations with a single sample are left out; the rest are sorted by
    /// mean duration, slowest first, keeping encounter order on ties.
    #[must_use]
    pub fn finish(self) -> AnalysisReport {
        let mut slowest_operations: Vec<OperationStats> = self
            .samples
            .iter()
            .filter(|(_, durations)| durations.len() > 1)
            .filter_map(|(operation, durations)| OperationStats::from_samples(operation, durations))
            .collect();
        slowest_operations.sort_by(|a, b| b.avg_duration_ms.total_cmp(&a.avg_duration_ms));

        AnalysisReport {
            total_logs: self.total_logs,
            logs_by_level: self.logs_by_level,
            requests: self.requests,
            errors: self.errors,
            slowest_operations,
        }
    }
}

/// Aggregates a single file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read; nothing from a
/// failed file is kept.
pub fn analyze_file(path: &Path, options: AnalysisOptions) -> Result<LogAggregator, AnalysisError> {
    let read_error = |source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_error)?;
    let mut aggregator = LogAggregator::new(options);
    aggregator
        .ingest_reader(BufReader::new(file))
        .map_err(read_error)?;
    tracing::debug!(
        path = %path.display(),
        records = aggregator.total_logs(),
        "Analyzed log file"
    );
    Ok(aggregator)
}

/// Aggregates `files` in parallel, one blocking worker per file.
///
/// Partial results merge in the order of `files`. A file that fails is
/// reported at warn level and skipped.
pub async fn analyze_files(files: &[PathBuf], options: AnalysisOptions) -> AnalysisReport {
    let workers: Vec<_> = files
        .iter()
        .cloned()
        .map(|path| tokio::task::spawn_blocking(move || analyze_file(&path, options)))
        .collect();

    let mut aggregate = LogAggregator::new(options);
    for (path, worker) in files.iter().zip(workers) {
        let result = worker.await.unwrap_or_else(|err| {
            Err(AnalysisError::Worker {
                path: path.clone(),
                reason: err.to_string(),
            })
        });
        match result {
            Ok(partial) => aggregate.merge(partial),
            Err(err) => tracing::warn!(error = %err, "Skipping log file"),
        }
    }

    aggregate.finish()
}
