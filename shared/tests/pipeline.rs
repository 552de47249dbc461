//! End-to-end tests: records written by the logging side are read back by
//! the analysis side.

use serde_json::json;
use shared::analysis::{
    analyze_files, discover_log_files, evaluate_alerts, parse_line, render_text, AnalysisOptions,
};
use shared::config::LoggingConfig;
use shared::logging::{ContextLayer, FormatKind, LoggingContext};
use shared::models::{LogEvent, LogLevel};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug)]
struct StorageFailure;

impl fmt::Display for StorageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bucket unavailable")
    }
}

impl std::error::Error for StorageFailure {}

fn file_only_config(dir: &Path, format: &str) -> LoggingConfig {
    serde_json::from_value(json!({
        "general": {"app_name": "image_analysis", "default_level": "debug"},
        "console": {"enabled": false},
        "file": {
            "level": "debug",
            "format": format,
            "directory": dir,
            "rotation": {"max_size_mb": 10, "backup_count": 5}
        },
        "metrics": {"enabled": true, "include_memory": false}
    }))
    .unwrap()
}

#[tokio::test]
async fn test_producer_output_is_analyzed() {
    let dir = TempDir::new().unwrap();
    let context = Arc::new(LoggingContext::from_config(&file_only_config(dir.path(), "json")).unwrap());

    let logger = context.logger("image_processing");
    logger.info("Service started");
    logger.debug("Loaded model");

    let request = logger.with_context(Some("req-1".to_string()), Some("user-1".to_string()));
    request.warning("Image larger than expected");
    request.exception("Upload failed", &StorageFailure);

    let timer = request.timer();
    for _ in 0..2 {
        timer.start("resize");
        timer.stop("resize", LogLevel::Info, None);
    }
    timer.start("upload");
    timer.stop("upload", LogLevel::Info, None);
    context.flush();

    let files = discover_log_files(dir.path(), 1).unwrap();
    assert_eq!(files, vec![dir.path().join("image_analysis.log")]);

    let options = AnalysisOptions::new(LogLevel::Info).with_metrics(true);
    let report = analyze_files(&files, options).await;

    assert_eq!(report.total_logs, 7);
    assert_eq!(report.logs_by_level.get("debug"), Some(&1));
    assert_eq!(report.logs_by_level.get("info"), Some(&4));
    assert_eq!(report.requests.get("req-1"), Some(&5));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].message.as_deref(), Some("Upload failed"));
    assert_eq!(report.errors[0].file.as_deref(), Some("pipeline.rs"));
    assert_eq!(report.errors[0].exception.as_deref(), Some("bucket unavailable"));

    assert_eq!(report.slowest_operations.len(), 1);
    assert_eq!(report.slowest_operations[0].operation, "resize");
    assert_eq!(report.slowest_operations[0].count, 2);

    assert_eq!(evaluate_alerts(&report, 1).len(), 1);
    assert!(render_text(&report).contains("\nErrors: 1\n"));
}

#[tokio::test]
async fn test_standard_format_is_analyzed() {
    let dir = TempDir::new().unwrap();
    let context =
        Arc::new(LoggingContext::from_config(&file_only_config(dir.path(), "standard")).unwrap());

    let logger = context.logger("aws_services");
    logger.info("Connected");
    logger.exception("Put failed", &StorageFailure);
    context.flush();

    let files = discover_log_files(dir.path(), 1).unwrap();
    let report = analyze_files(&files, AnalysisOptions::default()).await;

    // The exception text lands on its own line, which is not a record.
    assert_eq!(report.total_logs, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].message.as_deref(), Some("Put failed"));
    assert_eq!(report.errors[0].file.as_deref(), Some("pipeline.rs"));
}

#[tokio::test]
async fn test_tracing_events_reach_the_log_file() {
    let dir = TempDir::new().unwrap();
    let context = Arc::new(LoggingContext::from_config(&file_only_config(dir.path(), "json")).unwrap());

    let subscriber = tracing_subscriber::registry().with(ContextLayer::new(Arc::clone(&context)));
    tracing::subscriber::with_default(subscriber, || {
        tracing::error!(target: "fastapi", request_id = "req-7", "Handler crashed");
        tracing::info!(target: "fastapi", "Filtered by the logger override");
    });
    context.flush();

    let files = discover_log_files(dir.path(), 1).unwrap();
    let report = analyze_files(&files, AnalysisOptions::default()).await;

    assert_eq!(report.total_logs, 1);
    assert_eq!(report.requests.get("req-7"), Some(&1));
    assert_eq!(report.errors[0].message.as_deref(), Some("Handler crashed"));
}

#[test]
fn test_formatted_events_parse_back() {
    let events = LogLevel::ALL.iter().enumerate().map(|(i, level)| {
        let line = u32::try_from(i).unwrap() + 1;
        LogEvent::new("image_processing.resize", *level, format!("message {i}"), "resize.rs", line)
            .with_request_id(format!("req-{i}"))
            .with_user_id(format!("user-{i}"))
            .with_duration_ms(12.5)
            .with_memory_usage_mb(48.25)
            .with_exception("Traceback (most recent call last):\nValueError: bad size")
    });

    for event in events {
        for format in [FormatKind::Json, FormatKind::Standard] {
            let record = parse_line(&format.format(&event)).unwrap();
            let timestamp = event.timestamp.format(shared::logging::TIMESTAMP_FORMAT).to_string();

            assert_eq!(record.timestamp.as_deref(), Some(timestamp.as_str()));
            assert_eq!(record.name.as_deref(), Some(event.name.as_str()));
            assert_eq!(record.level, event.level.as_str());
            assert_eq!(record.file.as_deref(), Some("resize.rs"));
            assert_eq!(record.line, Some(event.line));
            assert_eq!(record.message.as_deref(), Some(event.message.as_str()));

            // The standard layout carries no optional fields.
            if format == FormatKind::Json {
                assert_eq!(record.request_id, event.request_id);
                assert_eq!(record.user_id, event.user_id);
                assert_eq!(record.duration_ms, Some(12.5));
                assert_eq!(record.memory_usage, Some(48.25));
                assert_eq!(record.exception, event.exception);
            }
        }
    }
}
