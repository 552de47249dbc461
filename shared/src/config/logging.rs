//! Logging configuration.
//!
//! The configuration arrives already parsed (from YAML, TOML, JSON or code);
//! this module only defines its shape, defaults, and validation. Every
//! string-keyed choice (levels, formats, rotation triggers) is resolved into
//! a closed type here, once, before any sink is built.

use crate::logging::format::FormatKind;
use crate::logging::rotation::{RotationPolicy, TimeUnit};
use crate::models::{LogLevel, UnknownLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use validator::Validate;

/// Errors raised while validating a logging configuration.
///
/// All of these are fatal: logging must not start half-configured.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A level name is not one of the five known levels.
    #[error("Invalid level for {field}: {source}")]
    InvalidLevel {
        /// Configuration field holding the bad value.
        field: String,
        /// The parse failure.
        source: UnknownLevel,
    },

    /// The rotation section cannot be turned into a policy.
    #[error("Invalid rotation settings: {0}")]
    InvalidRotation(String),

    /// The log directory cannot be created or written to.
    #[error("Log directory {path} is not writable: {source}")]
    UnwritableDirectory {
        /// The directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Field-level validation failed.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

fn parse_level(field: &str, value: &str) -> Result<LogLevel, ConfigError> {
    value.parse().map_err(|source| ConfigError::InvalidLevel {
        field: field.to_string(),
        source,
    })
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GeneralConfig {
    /// Application name; the active log file is `<app_name>.log`.
    #[validate(length(min = 1, message = "Application name cannot be empty"))]
    pub app_name: String,
    /// Level applied to loggers without an override.
    pub default_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            app_name: "image_analysis".to_string(),
            default_level: "info".to_string(),
        }
    }
}

/// Console sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Whether the console sink is installed.
    pub enabled: bool,
    /// Minimum level written to the console.
    pub level: String,
    /// Formatter name: `standard`, `json` or `simple`.
    pub format: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: "standard".to_string(),
        }
    }
}

/// Rotation trigger settings for the file sink.
///
/// Both a size trigger and a time trigger may be present; the size trigger
/// takes precedence. A deserialized section only carries the triggers it
/// names; the 10 MB / midnight pair applies when the section is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default = "RotationConfig::unset")]
pub struct RotationConfig {
    /// Whether rotation is enabled at all.
    pub enabled: bool,
    /// Size trigger in megabytes.
    #[validate(range(min = 1, message = "max_size_mb must be at least 1"))]
    pub max_size_mb: Option<u64>,
    /// Number of backup segments to keep.
    pub backup_count: Option<u32>,
    /// Time trigger unit (`S`, `M`, `H`, `D`, `midnight` or the long names).
    pub when: Option<String>,
    /// Number of units between time-based rollovers.
    #[validate(range(min = 1, message = "interval must be at least 1"))]
    pub interval: Option<u32>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_mb: Some(10),
            backup_count: Some(5),
            when: Some("midnight".to_string()),
            interval: Some(1),
        }
    }
}

impl RotationConfig {
    const DEFAULT_BACKUP_COUNT: u32 = 5;

    /// Rotation enabled with no trigger set.
    #[must_use]
    pub fn unset() -> Self {
        Self {
            enabled: true,
            max_size_mb: None,
            backup_count: None,
            when: None,
            interval: None,
        }
    }

    /// Resolves the settings into a single rotation policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the time unit is unknown or a numeric trigger is
    /// zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::RotationConfig;
    /// use shared::logging::RotationPolicy;
    ///
    /// // Both triggers present: size wins.
    /// let policy = RotationConfig::default().resolve().unwrap();
    /// assert!(matches!(policy, RotationPolicy::SizeBased { .. }));
    /// ```
    pub fn resolve(&self) -> Result<RotationPolicy, ConfigError> {
        self.validate()?;
        if !self.enabled {
            return Ok(RotationPolicy::None);
        }

        let backup_count = self.backup_count.unwrap_or(Self::DEFAULT_BACKUP_COUNT);

        if let Some(max_size_mb) = self.max_size_mb {
            let max_bytes = max_size_mb.checked_mul(1024 * 1024).ok_or_else(|| {
                ConfigError::InvalidRotation(format!("max_size_mb {max_size_mb} is too large"))
            })?;
            return Ok(RotationPolicy::SizeBased {
                max_bytes,
                backup_count,
            });
        }

        if let Some(when) = &self.when {
            let unit = when
                .parse::<TimeUnit>()
                .map_err(|e| ConfigError::InvalidRotation(e.to_string()))?;
            return Ok(RotationPolicy::TimeBased {
                unit,
                interval: self.interval.unwrap_or(1),
                backup_count,
            });
        }

        Ok(RotationPolicy::None)
    }
}

/// File sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FileConfig {
    /// Whether the file sink is installed.
    pub enabled: bool,
    /// Minimum level written to the file.
    pub level: String,
    /// Formatter name: `standard`, `json` or `simple`.
    pub format: String,
    /// Directory holding the active segment and its backups.
    pub directory: PathBuf,
    /// Rotation settings.
    #[validate(nested)]
    pub rotation: RotationConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: "json".to_string(),
            directory: PathBuf::from("logs"),
            rotation: RotationConfig::default(),
        }
    }
}

/// Performance metric settings used by timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether timer events carry `duration_ms` (and memory) fields.
    pub enabled: bool,
    /// Whether timers sample process memory when they stop.
    pub include_memory: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_memory: true,
        }
    }
}

/// Per-logger level override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerOverride {
    /// Level applied to the exact logger name.
    pub level: String,
}

/// Complete logging configuration.
///
/// # Example
///
/// ```
/// use shared::config::LoggingConfig;
///
/// let config: LoggingConfig = serde_json::from_value(serde_json::json!({
///     "general": {"app_name": "api"},
///     "file": {"enabled": false},
///     "loggers": {"fastapi": {"level": "warning"}}
/// }))
/// .unwrap();
///
/// assert_eq!(config.general.app_name, "api");
/// assert_eq!(config.general.default_level, "info");
/// assert!(config.validate_config().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application-wide settings.
    #[validate(nested)]
    pub general: GeneralConfig,
    /// Console sink settings.
    pub console: ConsoleConfig,
    /// File sink settings.
    #[validate(nested)]
    pub file: FileConfig,
    /// Timer metric settings.
    pub metrics: MetricsConfig,
    /// Exact-name level overrides.
    pub loggers: BTreeMap<String, LoggerOverride>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
            metrics: MetricsConfig::default(),
            loggers: BTreeMap::from([
                ("aws_services".to_string(), LoggerOverride::level("info")),
                ("image_processing".to_string(), LoggerOverride::level("debug")),
                ("langchain".to_string(), LoggerOverride::level("info")),
                ("fastapi".to_string(), LoggerOverride::level("warning")),
            ]),
        }
    }
}

impl LoggerOverride {
    /// Creates an override for the given level name.
    #[must_use]
    pub fn level(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
        }
    }
}

/// A configuration with every string-keyed choice resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Application name.
    pub app_name: String,
    /// Level for loggers without an override.
    pub default_level: LogLevel,
    /// Console sink, if enabled: minimum level and format.
    pub console: Option<(LogLevel, FormatKind)>,
    /// File sink, if enabled.
    pub file: Option<ResolvedFileConfig>,
    /// Timer metric settings.
    pub metrics: MetricsConfig,
    /// Exact-name level overrides.
    pub overrides: BTreeMap<String, LogLevel>,
}

/// Resolved file sink settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFileConfig {
    /// Minimum level written to the file.
    pub level: LogLevel,
    /// Line format.
    pub format: FormatKind,
    /// Path of the active segment.
    pub path: PathBuf,
    /// Rotation policy.
    pub rotation: RotationPolicy,
}

impl LoggingConfig {
    /// Validates the configuration without resolving it.
    ///
    /// # Errors
    ///
    /// Returns an error if any field is invalid.
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.resolve().map(|_| ())
    }

    /// Validates the configuration and resolves every named choice.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A level name is unknown
    /// - The application name is empty
    /// - The rotation settings are invalid
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        self.validate()?;

        let default_level = parse_level("general.default_level", &self.general.default_level)?;

        let console = if self.console.enabled {
            Some((
                parse_level("console.level", &self.console.level)?,
                FormatKind::from_name(&self.console.format),
            ))
        } else {
            None
        };

        let file = if self.file.enabled {
            Some(ResolvedFileConfig {
                level: parse_level("file.level", &self.file.level)?,
                format: FormatKind::from_name(&self.file.format),
                path: self
                    .file
                    .directory
                    .join(format!("{}.log", self.general.app_name)),
                rotation: self.file.rotation.resolve()?,
            })
        } else {
            None
        };

        let overrides = self
            .loggers
            .iter()
            .map(|(name, o)| {
                parse_level(&format!("loggers.{name}.level"), &o.level)
                    .map(|level| (name.clone(), level))
            })
            .collect::<Result<_, _>>()?;

        Ok(ResolvedConfig {
            app_name: self.general.app_name.clone(),
            default_level,
            console,
            file,
            metrics: self.metrics,
            overrides,
        })
    }
}
