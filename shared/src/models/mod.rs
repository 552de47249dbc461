//! Data models for the Loglens pipeline.
//!
//! `LogEvent` is produced by the logging side; `LogRecord` is what the
//! analyzer decodes back from log files.

pub mod log;
pub mod record;

pub use log::{level_value, LogEvent, LogLevel, UnknownLevel};
pub use record::LogRecord;
