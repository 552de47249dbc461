//! Loglens CLI
//!
//! Analyzes recent log files and optionally raises threshold alerts.
//!
//! # Usage
//!
//! ```bash
//! loglens --help
//! loglens --log-dir logs --hours 6 --min-level error
//! loglens --json --metrics
//! loglens --alerts --alert-threshold 10
//! ```
//!
//! Exit status is 0 on success, 1 when no log files were found in the
//! window, and 2 when alerts were requested and at least one fired.

#![deny(unsafe_code)]

use anyhow::Context;
use clap::{Parser, ValueEnum};
use shared::analysis::{
    analyze_files, discover_log_files, evaluate_alerts, render_json, render_text, Alert,
    AnalysisOptions,
};
use shared::models::LogLevel;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when no log files are found.
const EXIT_NO_FILES: u8 = 1;

/// Exit status when at least one alert fired.
const EXIT_ALERTS: u8 = 2;

/// Minimum level accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MinLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl From<MinLevel> for LogLevel {
    fn from(level: MinLevel) -> Self {
        match level {
            MinLevel::Debug => LogLevel::Debug,
            MinLevel::Info => LogLevel::Info,
            MinLevel::Warning => LogLevel::Warning,
            MinLevel::Error => LogLevel::Error,
            MinLevel::Critical => LogLevel::Critical,
        }
    }
}

/// Loglens - monitor and analyze log files
#[derive(Parser, Debug)]
#[command(name = "loglens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing log files
    #[arg(short, long, env = "LOGLENS_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Hours of logs to analyze
    #[arg(long, default_value_t = 24)]
    hours: u64,

    /// Minimum log level to include in the report
    #[arg(long, value_enum, default_value_t = MinLevel::Warning)]
    min_level: MinLevel,

    /// Output the report as JSON
    #[arg(long)]
    json: bool,

    /// Include performance metrics in the report
    #[arg(long)]
    metrics: bool,

    /// Check for alertable conditions
    #[arg(long)]
    alerts: bool,

    /// Number of errors before alerting
    #[arg(long, default_value_t = 5)]
    alert_threshold: usize,
}

impl Cli {
    fn options(&self) -> AnalysisOptions {
        AnalysisOptions::new(self.min_level.into()).with_metrics(self.metrics)
    }
}

/// Joins alerts into the block printed after the report.
fn alert_block(alerts: &[Alert]) -> String {
    let lines: Vec<String> = alerts.iter().map(ToString::to_string).collect();
    format!("\n{}", lines.join("\n"))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    run(&cli).await
}

async fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let files = match discover_log_files(&cli.log_dir, cli.hours) {
        Ok(files) => files,
        Err(err) => {
            tracing::warn!(error = %err, "Log discovery failed");
            Vec::new()
        }
    };

    if files.is_empty() {
        println!(
            "No log files found in {} from the past {} hours",
            cli.log_dir.display(),
            cli.hours
        );
        return Ok(ExitCode::from(EXIT_NO_FILES));
    }

    tracing::info!(count = files.len(), "Analyzing log files");
    let report = analyze_files(&files, cli.options()).await;

    if cli.json {
        println!(
            "{}",
            render_json(&report).context("Failed to serialize report")?
        );
    } else {
        println!("{}", render_text(&report));
    }

    if cli.alerts {
        let alerts = evaluate_alerts(&report, cli.alert_threshold);
        if !alerts.is_empty() {
            println!("{}", alert_block(&alerts));
            return Ok(ExitCode::from(EXIT_ALERTS));
        }
    }

    Ok(ExitCode::SUCCESS)
}
