//! Text and JSON renderings of an `AnalysisReport`.

use super::aggregate::AnalysisReport;
use crate::models::level_value;

/// Errors listed in full in the text report.
pub const MAX_LISTED_ERRORS: usize = 10;

/// Operations listed in the text report.
pub const MAX_LISTED_OPERATIONS: usize = 5;

const MISSING: &str = "N/A";

/// Formats milliseconds with at least one decimal: `200.0`, `12.34`.
#[must_use]
pub fn format_ms(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Renders the human-readable report.
///
/// # Examples
///
/// ```
/// use shared::analysis::{render_text, AnalysisReport};
///
/// let text = render_text(&AnalysisReport::default());
/// assert!(text.starts_with("=== Log Analysis Report ===\nTotal logs: 0"));
/// ```
#[must_use]
pub fn render_text(report: &AnalysisReport) -> String {
    let mut lines = vec![
        "=== Log Analysis Report ===".to_string(),
        format!("Total logs: {}", report.total_logs),
        "\nLog levels:".to_string(),
    ];

    let mut levels: Vec<(&String, &u64)> = report.logs_by_level.iter().collect();
    levels.sort_by(|a, b| (level_value(a.0), a.0).cmp(&(level_value(b.0), b.0)));
    for (level, count) in levels {
        lines.push(format!("  {}: {count}", level.to_uppercase()));
    }

    lines.push(format!("\nTotal requests: {}", report.requests.len()));
    lines.push(format!("\nErrors: {}", report.errors.len()));

    for (i, error) in report.errors.iter().take(MAX_LISTED_ERRORS).enumerate() {
        let line = error
            .line
            .map_or_else(|| MISSING.to_string(), |line| line.to_string());
        lines.push(format!(
            "\n{}. {} - {}:{line}",
            i + 1,
            error.timestamp.as_deref().unwrap_or(MISSING),
            error.file.as_deref().unwrap_or(MISSING),
        ));
        lines.push(format!(
            "   {}",
            error.message.as_deref().unwrap_or(MISSING)
        ));
        if let Some(exception) = &error.exception {
            lines.push(format!("   {}", exception.lines().next().unwrap_or("")));
        }
    }

    if report.errors.len() > MAX_LISTED_ERRORS {
        lines.push(format!(
            "\n... and {} more errors",
            report.errors.len() - MAX_LISTED_ERRORS
        ));
    }

    if !report.slowest_operations.is_empty() {
        lines.push("\nSlowest operations:".to_string());
        for (i, op) in report
            .slowest_operations
            .iter()
            .take(MAX_LISTED_OPERATIONS)
            .enumerate()
        {
            lines.push(format!("{}. {}", i + 1, op.operation));
            lines.push(format!(
                "   Avg: {}ms, Max: {}ms, Count: {}",
                format_ms(op.avg_duration_ms),
                format_ms(op.max_duration_ms),
                op.count
            ));
        }
    }

    lines.join("\n")
}

/// Renders the report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(report: &AnalysisReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
