//! Configuration module for loglens.
//!
//! This module contains the logging configuration consumed by the producer
//! side: its shape, defaults, and validation.

pub mod logging;

pub use logging::{
    ConfigError, ConsoleConfig, FileConfig, GeneralConfig, LoggerOverride, LoggingConfig,
    MetricsConfig, ResolvedConfig, ResolvedFileConfig, RotationConfig,
};
