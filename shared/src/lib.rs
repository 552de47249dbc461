//! Loglens Shared Library
//!
//! This crate contains the structured-logging producer and the offline
//! log-analysis consumer used by the loglens tools.
//!
//! # Modules
//!
//! - [`models`] - Log events and decoded log records
//! - [`config`] - Logging configuration and validation
//! - [`logging`] - Formatters, rotating sinks, loggers, and timers
//! - [`analysis`] - Log discovery, parsing, aggregation, alerts, and reports
//!
//! # Example
//!
//! ```
//! use shared::analysis::parse_line;
//! use shared::logging::FormatKind;
//! use shared::models::{LogEvent, LogLevel};
//!
//! let event = LogEvent::new("api", LogLevel::Error, "Upload failed", "upload.rs", 42)
//!     .with_request_id("req-1");
//!
//! let record = parse_line(&FormatKind::Json.format(&event)).unwrap();
//! assert_eq!(record.level, "error");
//! assert_eq!(record.request_id.as_deref(), Some("req-1"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod analysis;
pub mod config;
pub mod logging;
pub mod models;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
