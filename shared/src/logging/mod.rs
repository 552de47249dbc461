//! Structured logging producer.
//!
//! This module contains everything needed to emit records that the
//! [`analysis`](crate::analysis) module can later read back:
//!
//! - [`format`] - Standard, JSON, and simple line formats
//! - [`rotation`] - Size- and time-based segment rotation
//! - [`sink`] - Console, file, and in-memory destinations
//! - [`context`] - The shared context holding sinks and level overrides
//! - [`adapter`] - Named loggers and request-scoped adapters
//! - [`timer`] - Operation timers emitting durations
//! - [`layer`] - A `tracing` layer writing through the context

pub mod adapter;
pub mod context;
pub mod format;
pub mod layer;
pub mod rotation;
pub mod sink;
pub mod timer;

pub use adapter::{render_error_chain, ContextAdapter, Logger};
pub use context::{open_log_file, LoggingContext, LoggingContextBuilder};
pub use format::{FormatKind, TIMESTAMP_FORMAT};
pub use layer::{level_from_tracing, ContextLayer};
pub use rotation::{Clock, RotatingFile, RotationPolicy, TimeUnit, UnknownTimeUnit};
pub use sink::{ConsoleSink, FileSink, InMemorySink, Sink, SinkError};
pub use timer::{current_memory_mb, PerformanceTimer};
