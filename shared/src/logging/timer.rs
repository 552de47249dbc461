//! Named operation timers.
//!
//! A `PerformanceTimer` keeps one start instant per operation name. Stopping
//! an operation emits a single event whose message states the duration.
//! When metrics are enabled the event also carries `duration_ms` and,
//! optionally, the process resident memory.

use super::adapter::ContextAdapter;
use crate::models::LogLevel;
use std::collections::HashMap;
use std::panic::Location;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use sysinfo::{ProcessesToUpdate, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Samples the resident memory of the current process in megabytes.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn current_memory_mb() -> Option<f64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system
        .process(pid)
        .map(|process| process.memory() as f64 / BYTES_PER_MB)
}

/// Times named operations and logs their durations.
///
/// # Example
///
/// ```
/// use shared::logging::{FormatKind, InMemorySink, LoggingContext};
/// use shared::models::LogLevel;
/// use std::sync::Arc;
///
/// let sink = InMemorySink::new(LogLevel::Debug, FormatKind::Json);
/// let context = Arc::new(
///     LoggingContext::builder().default_level(LogLevel::Debug).sink(sink.clone()).build(),
/// );
///
/// let timer = context.logger("perf").timer();
/// timer.start("resize");
/// let elapsed = timer.stop("resize", LogLevel::Info, None);
///
/// assert!(elapsed.is_some());
/// assert!(sink.lines()[0].contains("(operation: resize) - Duration: "));
/// ```
#[derive(Debug)]
pub struct PerformanceTimer {
    adapter: ContextAdapter,
    started: Mutex<HashMap<String, Instant>>,
}

impl PerformanceTimer {
    /// Creates a timer emitting through `adapter`.
    #[must_use]
    pub fn new(adapter: ContextAdapter) -> Self {
        Self {
            adapter,
            started: Mutex::new(HashMap::new()),
        }
    }

    /// Records the start of `operation`, replacing any pending start.
    pub fn start(&self, operation: impl Into<String>) {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation.into(), Instant::now());
    }

    /// Returns true if `operation` has been started and not yet stopped.
    #[must_use]
    pub fn is_running(&self, operation: &str) -> bool {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(operation)
    }

    /// Stops `operation` and emits its duration at `level`.
    ///
    /// The message defaults to `Operation '<name>' completed`. Stopping an
    /// operation that was never started emits a warning instead and returns
    /// `None`.
    #[track_caller]
    pub fn stop(&self, operation: &str, level: LogLevel, message: Option<&str>) -> Option<f64> {
        let location = Location::caller();
        let started = self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(operation);

        let Some(started) = started else {
            let event = self.adapter.event_at(
                LogLevel::Warning,
                format!("Timer for operation '{operation}' was never started"),
                location,
            );
            self.adapter.emit(&event);
            return None;
        };

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let message = message.map_or_else(
            || format!("Operation '{operation}' completed"),
            ToString::to_string,
        );

        let mut event = self.adapter.event_at(
            level,
            format!("{message} (operation: {operation}) - Duration: {duration_ms:.2}ms"),
            location,
        );

        // With metrics disabled only the message carries the duration.
        let metrics = self.adapter.logger().context().metrics();
        if metrics.enabled {
            event = event.with_duration_ms(duration_ms);
            if metrics.include_memory {
                if let Some(memory) = current_memory_mb() {
                    event = event.with_memory_usage_mb(memory);
                }
            }
        }

        self.adapter.emit(&event);
        Some(duration_ms)
    }
}
