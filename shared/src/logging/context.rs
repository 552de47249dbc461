//! Process-wide logging context.
//!
//! A `LoggingContext` is built once at startup from a validated
//! configuration and shared as `Arc<LoggingContext>` with every producer.
//! There is no global registry: loggers, adapters and timers all hold a
//! handle to the context they emit through.

use super::adapter::Logger;
use super::format::FormatKind;
use super::rotation::RotationPolicy;
use super::sink::{ConsoleSink, FileSink, Sink};
use crate::config::{ConfigError, LoggingConfig, MetricsConfig};
use crate::models::{LogEvent, LogLevel};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Holds the configured sinks and the per-logger level overrides.
pub struct LoggingContext {
    default_level: LogLevel,
    overrides: HashMap<String, LogLevel>,
    sinks: Vec<Box<dyn Sink>>,
    metrics: MetricsConfig,
    dropped: AtomicU64,
}

impl std::fmt::Debug for LoggingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sinks: Vec<String> = self.sinks.iter().map(|s| s.describe()).collect();
        f.debug_struct("LoggingContext")
            .field("default_level", &self.default_level)
            .field("overrides", &self.overrides)
            .field("sinks", &sinks)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl LoggingContext {
    /// Builds a context from configuration.
    ///
    /// Validation is eager: the log directory is created and the active
    /// segment opened before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid (levels, rotation settings, app name)
    /// - The log directory cannot be created or the log file cannot be opened
    pub fn from_config(config: &LoggingConfig) -> Result<Self, ConfigError> {
        let resolved = config.resolve()?;
        let mut builder = Self::builder()
            .default_level(resolved.default_level)
            .metrics(resolved.metrics);

        for (name, level) in resolved.overrides {
            builder = builder.override_level(name, level);
        }

        if let Some((level, format)) = resolved.console {
            builder = builder.sink(ConsoleSink::new(level, format));
        }

        if let Some(file) = resolved.file {
            builder = builder.sink(open_log_file(
                &file.path,
                file.level,
                file.format,
                file.rotation,
            )?);
        }

        let context = builder.build();
        tracing::debug!(?context, "Logging context initialized");
        Ok(context)
    }

    /// Starts building a context from explicit sinks.
    #[must_use]
    pub fn builder() -> LoggingContextBuilder {
        LoggingContextBuilder::default()
    }

    /// Returns a named logger emitting through this context.
    #[must_use]
    pub fn logger(self: &Arc<Self>, name: impl Into<String>) -> Logger {
        Logger::new(Arc::clone(self), name)
    }

    /// Level applied to `name`: its exact-name override, else the default.
    #[must_use]
    pub fn effective_level(&self, name: &str) -> LogLevel {
        self.overrides
            .get(name)
            .copied()
            .unwrap_or(self.default_level)
    }

    /// Returns true if an event from `name` at `level` would reach the sinks.
    #[must_use]
    pub fn is_enabled(&self, name: &str, level: LogLevel) -> bool {
        level >= self.effective_level(name)
    }

    /// Fans an event out to every sink that accepts its level.
    ///
    /// A failing sink drops the event and the remaining sinks still receive
    /// it; the failure is counted and reported on standard error.
    pub fn emit(&self, event: &LogEvent) {
        if !self.is_enabled(&event.name, event.level) {
            return;
        }

        for sink in self.sinks.iter().filter(|s| s.accepts(event.level)) {
            if let Err(err) = sink.write(event) {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                // Not `tracing`: a `ContextLayer` would route this report back into the sinks.
                eprintln!("Failed to write log event to {}: {err}", sink.describe());
            }
        }
    }

    /// Timer metric settings.
    #[must_use]
    pub fn metrics(&self) -> MetricsConfig {
        self.metrics
    }

    /// Number of sink writes that failed since startup.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of installed sinks.
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Flushes every sink, ignoring individual failures.
    pub fn flush(&self) {
        for sink in &self.sinks {
            if let Err(err) = sink.flush() {
                eprintln!("Failed to flush {}: {err}", sink.describe());
            }
        }
    }
}

impl Drop for LoggingContext {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Builder for a `LoggingContext` with explicit sinks.
///
/// # Example
///
/// ```
/// use shared::logging::{FormatKind, InMemorySink, LoggingContext};
/// use shared::models::LogLevel;
/// use std::sync::Arc;
///
/// let sink = InMemorySink::new(LogLevel::Debug, FormatKind::Simple);
/// let context = Arc::new(
///     LoggingContext::builder()
///         .default_level(LogLevel::Info)
///         .override_level("chatty", LogLevel::Error)
///         .sink(sink.clone())
///         .build(),
/// );
///
/// context.logger("app").info("started");
/// context.logger("chatty").warning("ignored");
///
/// assert_eq!(sink.lines(), vec!["INFO - started".to_string()]);
/// ```
#[derive(Default)]
pub struct LoggingContextBuilder {
    default_level: LogLevel,
    overrides: HashMap<String, LogLevel>,
    sinks: Vec<Box<dyn Sink>>,
    metrics: MetricsConfig,
}

impl LoggingContextBuilder {
    /// Sets the level for loggers without an override.
    #[must_use]
    pub fn default_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    /// Sets an exact-name level override.
    #[must_use]
    pub fn override_level(mut self, name: impl Into<String>, level: LogLevel) -> Self {
        self.overrides.insert(name.into(), level);
        self
    }

    /// Appends a sink; sinks receive events in insertion order.
    #[must_use]
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Appends a console sink writing to standard output.
    #[must_use]
    pub fn console(self, level: LogLevel, format: FormatKind) -> Self {
        self.sink(ConsoleSink::new(level, format))
    }

    /// Sets the timer metric settings.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }

    /// Finishes the context.
    #[must_use]
    pub fn build(self) -> LoggingContext {
        LoggingContext {
            default_level: self.default_level,
            overrides: self.overrides,
            sinks: self.sinks,
            metrics: self.metrics,
            dropped: AtomicU64::new(0),
        }
    }
}

/// Opens a file sink at `path`, creating its directory first.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file opened.
pub fn open_log_file(
    path: impl AsRef<Path>,
    level: LogLevel,
    format: FormatKind,
    policy: RotationPolicy,
) -> Result<FileSink, ConfigError> {
    let path = path.as_ref();
    let directory = path.parent().unwrap_or_else(|| Path::new(""));
    let unwritable = |source| ConfigError::UnwritableDirectory {
        path: directory.to_path_buf(),
        source,
    };
    fs::create_dir_all(directory).map_err(unwritable)?;
    FileSink::open(path, level, format, policy).map_err(unwritable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::sink::{InMemorySink, SinkError};
    use serde_json::json;
    use tempfile::TempDir;

    struct FailingSink;

    impl Sink for FailingSink {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }

        fn write(&self, _event: &LogEvent) -> Result<(), SinkError> {
            Err(SinkError::LockError)
        }

        fn flush(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn event(name: &str, level: LogLevel, message: &str) -> LogEvent {
        LogEvent::new(name, level, message, "context.rs", 1)
    }

    #[test]
    fn test_emit_respects_default_level() {
        let sink = InMemorySink::new(LogLevel::Debug, FormatKind::Simple);
        let context = LoggingContext::builder()
            .default_level(LogLevel::Warning)
            .sink(sink.clone())
            .build();

        context.emit(&event("app", LogLevel::Info, "quiet"));
        context.emit(&event("app", LogLevel::Error, "loud"));

        assert_eq!(sink.lines(), vec!["ERROR - loud".to_string()]);
    }

    #[test]
    fn test_override_matches_exact_name_only() {
        let sink = InMemorySink::new(LogLevel::Debug, FormatKind::Simple);
        let context = LoggingContext::builder()
            .default_level(LogLevel::Info)
            .override_level("image_processing", LogLevel::Debug)
            .sink(sink.clone())
            .build();

        context.emit(&event("image_processing", LogLevel::Debug, "kept"));
        context.emit(&event("image_processing.resize", LogLevel::Debug, "dropped"));

        assert_eq!(sink.lines(), vec!["DEBUG - kept".to_string()]);
        assert_eq!(context.effective_level("image_processing.resize"), LogLevel::Info);
    }

    #[test]
    fn test_sink_floors_apply_independently() {
        let verbose = InMemorySink::new(LogLevel::Debug, FormatKind::Simple);
        let strict = InMemorySink::new(LogLevel::Error, FormatKind::Simple);
        let context = LoggingContext::builder()
            .default_level(LogLevel::Debug)
            .sink(verbose.clone())
            .sink(strict.clone())
            .build();

        context.emit(&event("app", LogLevel::Info, "info"));
        context.emit(&event("app", LogLevel::Critical, "critical"));

        assert_eq!(verbose.lines().len(), 2);
        assert_eq!(strict.lines(), vec!["CRITICAL - critical".to_string()]);
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let sink = InMemorySink::new(LogLevel::Debug, FormatKind::Simple);
        let context = LoggingContext::builder()
            .default_level(LogLevel::Debug)
            .sink(FailingSink)
            .sink(sink.clone())
            .build();

        context.emit(&event("app", LogLevel::Info, "still delivered"));

        assert_eq!(sink.lines(), vec!["INFO - still delivered".to_string()]);
        assert_eq!(context.dropped_events(), 1);
    }

    #[test]
    fn test_from_config_creates_directory_and_file() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        let config: LoggingConfig = serde_json::from_value(json!({
            "general": {"app_name": "svc", "default_level": "debug"},
            "console": {"enabled": false},
            "file": {
                "directory": log_dir,
                "format": "standard",
                "rotation": {"enabled": false}
            }
        }))
        .unwrap();

        let context = Arc::new(LoggingContext::from_config(&config).unwrap());
        assert_eq!(context.sink_count(), 1);
        context.logger("svc").info("hello file");
        context.flush();

        let content = std::fs::read_to_string(log_dir.join("svc.log")).unwrap();
        assert!(content.contains(" - svc - INFO - [context.rs:"));
        assert!(content.trim_end().ends_with("hello file"));
    }

    #[test]
    fn test_from_config_rejects_unwritable_directory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file in the way").unwrap();

        let mut config = LoggingConfig::default();
        config.console.enabled = false;
        config.file.directory = blocker.join("logs");

        let err = LoggingContext::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::UnwritableDirectory { .. }));
    }

    #[test]
    fn test_from_config_rejects_invalid_rotation() {
        let mut config = LoggingConfig::default();
        config.console.enabled = false;
        config.file.rotation.max_size_mb = None;
        config.file.rotation.when = Some("sometimes".to_string());

        assert!(matches!(
            LoggingContext::from_config(&config),
            Err(ConfigError::InvalidRotation(_))
        ));
    }

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("worker.log");
        let sink = open_log_file(&path, LogLevel::Info, FormatKind::Json, RotationPolicy::None)
            .unwrap();
        assert_eq!(sink.path(), path);
        assert!(path.is_file());
    }
}
