//! Log file discovery.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Errors that can occur while listing a log directory.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The directory could not be listed.
    #[error("Cannot read log directory {path}: {source}")]
    Unreadable {
        /// The directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Returns true for names like `app.log`, `app.log.1` or `app.log.2024-03-05`.
#[must_use]
pub fn is_log_file_name(name: &str) -> bool {
    !name.starts_with('.') && name.contains(".log")
}

/// Lists the log files in `dir` modified within the last `hours` hours.
///
/// Subdirectories are not searched. The result is sorted by path; an empty
/// list means no file fell inside the window.
///
/// # Errors
///
/// Returns an error if `dir` is missing or cannot be listed.
pub fn discover_log_files(dir: &Path, hours: u64) -> Result<Vec<PathBuf>, DiscoveryError> {
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(hours.saturating_mul(3600)))
        .unwrap_or(SystemTime::UNIX_EPOCH);
    discover_modified_since(dir, cutoff)
}

/// Lists the log files in `dir` whose modification time is at or after `cutoff`.
///
/// # Errors
///
/// Returns an error if `dir` is missing or cannot be listed.
pub fn discover_modified_since(
    dir: &Path,
    cutoff: SystemTime,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let entries = fs::read_dir(dir).map_err(|source| DiscoveryError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_log_file_name(name) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        match metadata.modified() {
            Ok(modified) if modified >= cutoff => files.push(entry.path()),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), error = %err, "Cannot read modification time");
            }
        }
    }

    files.sort();
    tracing::debug!(dir = %dir.display(), count = files.len(), "Discovered log files");
    Ok(files)
}
