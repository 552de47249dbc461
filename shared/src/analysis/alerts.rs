//! Threshold alerts over a finished report.

use super::aggregate::AnalysisReport;
use super::report::format_ms;
use std::fmt;

/// Mean duration above which an operation raises an alert.
pub const SLOW_OPERATION_THRESHOLD_MS: f64 = 1000.0;

/// A fired alert condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// The error count reached the threshold.
    ErrorCount {
        /// Errors in the report.
        count: usize,
        /// Configured threshold.
        threshold: usize,
    },
    /// An operation's mean duration exceeded `SLOW_OPERATION_THRESHOLD_MS`.
    SlowOperation {
        /// Operation name.
        operation: String,
        /// Mean duration in milliseconds.
        avg_duration_ms: f64,
    },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ErrorCount { count, threshold } => {
                write!(f, "ALERT: {count} errors detected (threshold: {threshold})")
            }
            Self::SlowOperation {
                operation,
                avg_duration_ms,
            } => write!(
                f,
                "ALERT: Slow operation detected: {operation} ({}ms)",
                format_ms(*avg_duration_ms)
            ),
        }
    }
}

/// Evaluates the alert conditions against `report`.
///
/// The error alert fires when the error count is at least `error_threshold`.
/// Slow-operation alerts follow the report's slowest-first order.
///
/// # Examples
///
/// ```
/// use shared::analysis::{evaluate_alerts, AnalysisReport};
///
/// let report = AnalysisReport::default();
/// assert!(evaluate_alerts(&report, 5).is_empty());
/// ```
#[must_use]
pub fn evaluate_alerts(report: &AnalysisReport, error_threshold: usize) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if report.errors.len() >= error_threshold {
        alerts.push(Alert::ErrorCount {
            count: report.errors.len(),
            threshold: error_threshold,
        });
    }

    alerts.extend(
        report
            .slowest_operations
            .iter()
            .filter(|op| op.avg_duration_ms > SLOW_OPERATION_THRESHOLD_MS)
            .map(|op| Alert::SlowOperation {
                operation: op.operation.clone(),
                avg_duration_ms: op.avg_duration_ms,
            }),
    );

    alerts
}
