//! Sink trait and implementations.
//!
//! A sink is a destination for formatted events with its own minimum level.
//! Every sink serializes its writes behind a lock, so concurrent emitters
//! never interleave partial lines.

use super::format::FormatKind;
use super::rotation::{RotatingFile, RotationPolicy};
use crate::models::{LogEvent, LogLevel};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

/// Errors that can occur while writing to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Failed to acquire the sink's lock.
    #[error("Failed to acquire lock on sink")]
    LockError,

    /// The underlying write failed.
    #[error("Write failed: {0}")]
    Io(#[from] io::Error),
}

/// A destination for log events.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait Sink: Send + Sync {
    /// Short description used in diagnostics.
    fn describe(&self) -> String;

    /// Minimum level this sink accepts.
    fn min_level(&self) -> LogLevel;

    /// Formats and writes one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the event is then lost for this
    /// sink only.
    fn write(&self, event: &LogEvent) -> Result<(), SinkError>;

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&self) -> Result<(), SinkError>;

    /// Returns true if an event at `level` passes this sink's floor.
    fn accepts(&self, level: LogLevel) -> bool {
        level >= self.min_level()
    }
}

/// Sink writing to standard output (or any writer, for tests).
pub struct ConsoleSink {
    level: LogLevel,
    format: FormatKind,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Creates a console sink writing to standard output.
    #[must_use]
    pub fn new(level: LogLevel, format: FormatKind) -> Self {
        Self::with_writer(level, format, Box::new(io::stdout()))
    }

    /// Creates a console sink writing to a custom writer.
    #[must_use]
    pub fn with_writer(level: LogLevel, format: FormatKind, writer: Box<dyn Write + Send>) -> Self {
        Self {
            level,
            format,
            writer: Mutex::new(writer),
        }
    }
}

impl Sink for ConsoleSink {
    fn describe(&self) -> String {
        "console".to_string()
    }

    fn min_level(&self) -> LogLevel {
        self.level
    }

    fn write(&self, event: &LogEvent) -> Result<(), SinkError> {
        let line = self.format.format(event);
        let mut writer = self.writer.lock().map_err(|_| SinkError::LockError)?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::LockError)?;
        writer.flush()?;
        Ok(())
    }
}

/// Sink appending to a rotating file.
#[derive(Debug)]
pub struct FileSink {
    level: LogLevel,
    format: FormatKind,
    path: PathBuf,
    file: Mutex<RotatingFile>,
}

impl FileSink {
    /// Opens a file sink at `path` with the given rotation policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for appending.
    pub fn open(
        path: impl Into<PathBuf>,
        level: LogLevel,
        format: FormatKind,
        policy: RotationPolicy,
    ) -> io::Result<Self> {
        Ok(Self::from_file(RotatingFile::open(path, policy)?, level, format))
    }

    /// Wraps an already opened rotating file.
    #[must_use]
    pub fn from_file(file: RotatingFile, level: LogLevel, format: FormatKind) -> Self {
        Self {
            level,
            format,
            path: file.path().to_path_buf(),
            file: Mutex::new(file),
        }
    }

    /// Path of the active segment.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn min_level(&self) -> LogLevel {
        self.level
    }

    fn write(&self, event: &LogEvent) -> Result<(), SinkError> {
        let line = self.format.format(event);
        let mut file = self.file.lock().map_err(|_| SinkError::LockError)?;
        file.write_line(&line)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut file = self.file.lock().map_err(|_| SinkError::LockError)?;
        file.flush()?;
        Ok(())
    }
}

/// Sink keeping formatted lines in memory.
///
/// Clones share the same buffer, so a clone kept by the caller observes
/// everything written through a clone handed to a `LoggingContext`.
///
/// # Example
///
/// ```
/// use shared::logging::{FormatKind, InMemorySink, Sink};
/// use shared::models::{LogEvent, LogLevel};
///
/// let sink = InMemorySink::new(LogLevel::Debug, FormatKind::Simple);
/// sink.write(&LogEvent::new("app", LogLevel::Info, "ready", "main.rs", 1)).unwrap();
///
/// assert_eq!(sink.lines(), vec!["INFO - ready".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    level: LogLevel,
    format: FormatKind,
    lines: Arc<RwLock<Vec<String>>>,
}

impl InMemorySink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new(level: LogLevel, format: FormatKind) -> Self {
        Self {
            level,
            format,
            lines: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Returns a copy of every line written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .read()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl Sink for InMemorySink {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn min_level(&self) -> LogLevel {
        self.level
    }

    fn write(&self, event: &LogEvent) -> Result<(), SinkError> {
        let line = self.format.format(event);
        self.lines
            .write()
            .map_err(|_| SinkError::LockError)?
            .push(line);
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    /// Writer that appends into a shared buffer.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn event(level: LogLevel, message: &str) -> LogEvent {
        LogEvent::new("test", level, message, "sink.rs", 1)
    }

    #[test]
    fn test_console_sink_writes_lines() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::with_writer(LogLevel::Info, FormatKind::Simple, Box::new(buf.clone()));

        sink.write(&event(LogLevel::Warning, "disk almost full")).unwrap();

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out, "WARNING - disk almost full\n");
    }

    #[test]
    fn test_sink_accepts_by_level() {
        let sink = InMemorySink::new(LogLevel::Warning, FormatKind::Simple);
        assert!(!sink.accepts(LogLevel::Info));
        assert!(sink.accepts(LogLevel::Warning));
        assert!(sink.accepts(LogLevel::Critical));
    }

    #[test]
    fn test_file_sink_writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let sink = FileSink::open(&path, LogLevel::Debug, FormatKind::Json, RotationPolicy::None)
            .unwrap();

        sink.write(&event(LogLevel::Info, "one")).unwrap();
        sink.write(&event(LogLevel::Error, "two")).unwrap();
        sink.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"message\":\"two\""));
        assert_eq!(sink.describe(), format!("file {}", path.display()));
    }

    #[test]
    fn test_file_sink_concurrent_writes_never_interleave() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationPolicy::SizeBased {
            max_bytes: 4096,
            backup_count: 50,
        };
        let sink = Arc::new(
            FileSink::open(&path, LogLevel::Debug, FormatKind::Json, policy).unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..50 {
                        sink.write(&event(LogLevel::Info, &format!("thread {t} event {i}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        sink.flush().unwrap();

        let mut total = 0;
        for entry in fs::read_dir(dir.path()).unwrap() {
            let content = fs::read_to_string(entry.unwrap().path()).unwrap();
            for line in content.lines() {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                assert!(value["message"].as_str().unwrap().starts_with("thread "));
                total += 1;
            }
        }
        assert_eq!(total, 400);
    }

    #[test]
    fn test_in_memory_sink_clones_share_buffer() {
        let sink = InMemorySink::new(LogLevel::Debug, FormatKind::Simple);
        let handle = sink.clone();

        sink.write(&event(LogLevel::Debug, "shared")).unwrap();

        assert_eq!(handle.lines(), vec!["DEBUG - shared".to_string()]);
    }
}
