//! Rotating log file.
//!
//! `RotatingFile` owns the active segment of a file sink and enforces its
//! `RotationPolicy` before every write. Rotation and the write that
//! triggered it happen under the same `&mut self`, so a line is never split
//! across two segments.
//!
//! Backup naming:
//!
//! ```text
//! size-based:  app.log  app.log.1  app.log.2 ...        (.1 is the newest)
//! time-based:  app.log  app.log.2024-03-04  app.log.2024-03-05 ...
//! ```

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Source of the current time for time-based rotation.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Unit of a time-based rotation interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Rotate every `interval` seconds.
    Seconds,
    /// Rotate every `interval` minutes.
    Minutes,
    /// Rotate every `interval` hours.
    Hours,
    /// Rotate every `interval` days, counted from the segment start.
    Days,
    /// Rotate at local midnight (every `interval` days).
    Midnight,
}

/// Error returned for an unrecognized rotation unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown rotation unit: '{0}'. Expected S, M, H, D or midnight")]
pub struct UnknownTimeUnit(pub String);

impl FromStr for TimeUnit {
    type Err = UnknownTimeUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "seconds" => Ok(Self::Seconds),
            "m" | "minutes" => Ok(Self::Minutes),
            "h" | "hours" => Ok(Self::Hours),
            "d" | "days" => Ok(Self::Days),
            "midnight" => Ok(Self::Midnight),
            _ => Err(UnknownTimeUnit(s.to_string())),
        }
    }
}

impl TimeUnit {
    /// `strftime` layout of the backup suffix for this unit.
    #[must_use]
    pub const fn suffix_format(self) -> &'static str {
        match self {
            Self::Seconds => "%Y-%m-%d_%H-%M-%S",
            Self::Minutes => "%Y-%m-%d_%H-%M",
            Self::Hours => "%Y-%m-%d_%H",
            Self::Days | Self::Midnight => "%Y-%m-%d",
        }
    }

    /// Shape of the suffix: `d` stands for a digit, anything else is literal.
    const fn suffix_shape(self) -> &'static str {
        match self {
            Self::Seconds => "dddd-dd-dd_dd-dd-dd",
            Self::Minutes => "dddd-dd-dd_dd-dd",
            Self::Hours => "dddd-dd-dd_dd",
            Self::Days | Self::Midnight => "dddd-dd-dd",
        }
    }

    fn period(self, interval: u32) -> Duration {
        let interval = i64::from(interval.max(1));
        match self {
            Self::Seconds => Duration::seconds(interval),
            Self::Minutes => Duration::minutes(interval),
            Self::Hours => Duration::hours(interval),
            Self::Days | Self::Midnight => Duration::days(interval),
        }
    }

    /// Computes the first rollover instant strictly after `from`.
    #[must_use]
    pub fn next_rollover(self, interval: u32, from: DateTime<Local>) -> DateTime<Local> {
        if self != Self::Midnight {
            return from + self.period(interval);
        }

        let extra_days = i64::from(interval.max(1)) - 1;
        let next_day = from.date_naive() + Duration::days(1 + extra_days);
        let midnight = next_day.and_time(NaiveTime::MIN);
        Local
            .from_local_datetime(&midnight)
            .earliest()
            .unwrap_or_else(|| from + self.period(interval))
    }

    fn matches_suffix(self, suffix: &str) -> bool {
        let shape = self.suffix_shape();
        suffix.len() == shape.len()
            && suffix.chars().zip(shape.chars()).all(|(c, s)| {
                if s == 'd' {
                    c.is_ascii_digit()
                } else {
                    c == s
                }
            })
    }
}

/// When a file sink starts a new segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RotationPolicy {
    /// A single ever-growing file.
    None,
    /// Rotate when the active segment would exceed `max_bytes`.
    SizeBased {
        /// Size limit of the active segment in bytes.
        max_bytes: u64,
        /// Number of numbered backups kept.
        backup_count: u32,
    },
    /// Rotate when a time boundary is crossed.
    TimeBased {
        /// Boundary unit.
        unit: TimeUnit,
        /// Number of units per segment.
        interval: u32,
        /// Number of timestamped backups kept (0 keeps all).
        backup_count: u32,
    },
}

/// The active segment of a file sink.
pub struct RotatingFile {
    path: PathBuf,
    policy: RotationPolicy,
    file: Option<File>,
    size: u64,
    rollover_at: Option<DateTime<Local>>,
    clock: Clock,
}

impl std::fmt::Debug for RotatingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFile")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("size", &self.size)
            .field("rollover_at", &self.rollover_at)
            .finish_non_exhaustive()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl RotatingFile {
    /// Opens (or creates) the active segment at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for appending.
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy) -> io::Result<Self> {
        Self::with_clock(path, policy, Arc::new(Local::now))
    }

    /// Opens the active segment with a custom time source.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for appending.
    pub fn with_clock(
        path: impl Into<PathBuf>,
        policy: RotationPolicy,
        clock: Clock,
    ) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let metadata = file.metadata()?;

        let rollover_at = match policy {
            RotationPolicy::TimeBased { unit, interval, .. } => {
                // An existing segment keeps the period it was started in.
                let base = if metadata.len() > 0 {
                    metadata.modified().map_or_else(|_| clock(), DateTime::<Local>::from)
                } else {
                    clock()
                };
                Some(unit.next_rollover(interval, base))
            }
            _ => None,
        };

        Ok(Self {
            path,
            policy,
            file: Some(file),
            size: metadata.len(),
            rollover_at,
            clock,
        })
    }

    /// Path of the active segment.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the active segment in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Appends one line (a newline is added), rotating first if required.
    ///
    /// # Errors
    ///
    /// Returns an error if rotation or the write fails. The line is then not
    /// written to any segment.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        let incoming = buf.len() as u64;

        let now = (self.clock)();
        if self.should_rollover(incoming, now) {
            self.rollover(now)?;
        }

        // A failed rotation leaves no open segment; recover on the next write.
        if self.file.is_none() {
            let reopened = open_append(&self.path)?;
            self.size = reopened.metadata()?.len();
            self.file = Some(reopened);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf.as_bytes())?;
            self.size += incoming;
        }
        Ok(())
    }

    /// Flushes the active segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }

    fn should_rollover(&self, incoming: u64, now: DateTime<Local>) -> bool {
        match self.policy {
            RotationPolicy::None => false,
            // An empty segment takes the line whole, whatever its size.
            RotationPolicy::SizeBased { max_bytes, .. } => {
                self.size > 0 && self.size + incoming > max_bytes
            }
            RotationPolicy::TimeBased { .. } => self.rollover_at.is_some_and(|at| now >= at),
        }
    }

    fn rollover(&mut self, now: DateTime<Local>) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        match self.policy {
            RotationPolicy::None => {}
            RotationPolicy::SizeBased { backup_count, .. } => self.shift_numbered(backup_count)?,
            RotationPolicy::TimeBased {
                unit,
                interval,
                backup_count,
            } => {
                let started = self
                    .rollover_at
                    .map_or(now, |at| at - unit.period(interval));
                let target = self.backup_path(&started.format(unit.suffix_format()).to_string());
                if target.exists() {
                    fs::remove_file(&target)?;
                }
                fs::rename(&self.path, &target)?;
                self.prune_timed(unit, backup_count)?;

                let mut next = unit.next_rollover(interval, now);
                while next <= now {
                    next = unit.next_rollover(interval, next);
                }
                self.rollover_at = Some(next);
            }
        }

        self.file = Some(open_append(&self.path)?);
        self.size = 0;
        Ok(())
    }

    fn backup_path(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }

    fn shift_numbered(&self, backup_count: u32) -> io::Result<()> {
        if backup_count == 0 {
            return fs::remove_file(&self.path);
        }

        for i in (1..backup_count).rev() {
            let src = self.backup_path(&i.to_string());
            if src.exists() {
                let dst = self.backup_path(&(i + 1).to_string());
                if dst.exists() {
                    fs::remove_file(&dst)?;
                }
                fs::rename(&src, &dst)?;
            }
        }

        let first = self.backup_path("1");
        if first.exists() {
            fs::remove_file(&first)?;
        }
        fs::rename(&self.path, &first)
    }

    fn prune_timed(&self, unit: TimeUnit, backup_count: u32) -> io::Result<()> {
        if backup_count == 0 {
            return Ok(());
        }

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let Some(base) = self.path.file_name().and_then(|n| n.to_str()) else {
            return Ok(());
        };
        let prefix = format!("{base}.");

        let mut backups: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix(&prefix))
                    .is_some_and(|suffix| unit.matches_suffix(suffix))
            })
            .map(|entry| entry.path())
            .collect();

        // Suffixes are zero-padded, so lexical order is chronological.
        backups.sort();
        let excess = backups.len().saturating_sub(backup_count as usize);
        for old in backups.into_iter().take(excess) {
            fs::remove_file(old)?;
        }
        Ok(())
    }
}

impl Drop for RotatingFile {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn manual_clock(start: DateTime<Local>) -> (Clock, Arc<Mutex<DateTime<Local>>>) {
        let now = Arc::new(Mutex::new(start));
        let handle = Arc::clone(&now);
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (clock, now)
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_time_unit_from_str() {
        assert_eq!("S".parse::<TimeUnit>().unwrap(), TimeUnit::Seconds);
        assert_eq!("minutes".parse::<TimeUnit>().unwrap(), TimeUnit::Minutes);
        assert_eq!("h".parse::<TimeUnit>().unwrap(), TimeUnit::Hours);
        assert_eq!("D".parse::<TimeUnit>().unwrap(), TimeUnit::Days);
        assert_eq!("MIDNIGHT".parse::<TimeUnit>().unwrap(), TimeUnit::Midnight);
        assert!("W0".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_next_rollover_fixed_units() {
        let from = Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(
            TimeUnit::Seconds.next_rollover(30, from),
            from + Duration::seconds(30)
        );
        assert_eq!(
            TimeUnit::Hours.next_rollover(2, from),
            from + Duration::hours(2)
        );
        assert_eq!(
            TimeUnit::Days.next_rollover(1, from),
            from + Duration::days(1)
        );
    }

    #[test]
    fn test_next_rollover_midnight() {
        let from = Local.with_ymd_and_hms(2024, 5, 1, 22, 15, 0).unwrap();
        let next = TimeUnit::Midnight.next_rollover(1, from);
        assert_eq!(next, Local.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());

        let later = TimeUnit::Midnight.next_rollover(3, from);
        assert_eq!(later, Local.with_ymd_and_hms(2024, 5, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_matches_suffix() {
        assert!(TimeUnit::Days.matches_suffix("2024-05-01"));
        assert!(TimeUnit::Seconds.matches_suffix("2024-05-01_10-00-30"));
        assert!(!TimeUnit::Days.matches_suffix("1"));
        assert!(!TimeUnit::Hours.matches_suffix("2024-05-01_1x"));
    }

    #[test]
    fn test_no_rotation_grows_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, RotationPolicy::None).unwrap();

        for i in 0..100 {
            file.write_line(&format!("line {i}")).unwrap();
        }

        assert_eq!(read(&path).lines().count(), 100);
        assert!(!dir.path().join("app.log.1").exists());
    }

    #[test]
    fn test_size_rotation_keeps_lines_whole() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationPolicy::SizeBased {
            max_bytes: 20,
            backup_count: 3,
        };
        let mut file = RotatingFile::open(&path, policy).unwrap();

        // Each line is 10 bytes including the newline.
        file.write_line("aaaaaaaaa").unwrap();
        file.write_line("bbbbbbbbb").unwrap();
        assert_eq!(file.size(), 20);
        file.write_line("ccccccccc").unwrap();

        assert_eq!(read(&dir.path().join("app.log.1")), "aaaaaaaaa\nbbbbbbbbb\n");
        assert_eq!(read(&path), "ccccccccc\n");
        assert_eq!(file.size(), 10);
    }

    #[test]
    fn test_size_rotation_shifts_and_discards_oldest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationPolicy::SizeBased {
            max_bytes: 5,
            backup_count: 2,
        };
        let mut file = RotatingFile::open(&path, policy).unwrap();

        for line in ["one", "two", "three", "four"] {
            file.write_line(line).unwrap();
        }

        assert_eq!(read(&path), "four\n");
        assert_eq!(read(&dir.path().join("app.log.1")), "three\n");
        assert_eq!(read(&dir.path().join("app.log.2")), "two\n");
        assert!(!dir.path().join("app.log.3").exists());
    }

    #[test]
    fn test_oversized_line_goes_to_fresh_segment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationPolicy::SizeBased {
            max_bytes: 8,
            backup_count: 1,
        };
        let mut file = RotatingFile::open(&path, policy).unwrap();

        file.write_line("this line is longer than the limit").unwrap();
        assert_eq!(read(&path), "this line is longer than the limit\n");
        assert!(!dir.path().join("app.log.1").exists());

        file.write_line("next").unwrap();
        assert_eq!(
            read(&dir.path().join("app.log.1")),
            "this line is longer than the limit\n"
        );
        assert_eq!(read(&path), "next\n");
    }

    #[test]
    fn test_size_rotation_without_backups_discards_segment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationPolicy::SizeBased {
            max_bytes: 6,
            backup_count: 0,
        };
        let mut file = RotatingFile::open(&path, policy).unwrap();

        file.write_line("first").unwrap();
        file.write_line("second").unwrap();

        assert_eq!(read(&path), "second\n");
        assert!(!dir.path().join("app.log.1").exists());
    }

    #[test]
    fn test_existing_file_size_is_respected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "0123456789\n").unwrap();

        let policy = RotationPolicy::SizeBased {
            max_bytes: 12,
            backup_count: 1,
        };
        let mut file = RotatingFile::open(&path, policy).unwrap();
        assert_eq!(file.size(), 11);

        file.write_line("x").unwrap();
        assert_eq!(read(&dir.path().join("app.log.1")), "0123456789\n");
        assert_eq!(read(&path), "x\n");
    }

    #[test]
    fn test_time_rotation_on_boundary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let start = Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let (clock, now) = manual_clock(start);
        let policy = RotationPolicy::TimeBased {
            unit: TimeUnit::Minutes,
            interval: 1,
            backup_count: 5,
        };
        let mut file = RotatingFile::with_clock(&path, policy, clock).unwrap();

        file.write_line("before").unwrap();
        *now.lock().unwrap() = start + Duration::seconds(59);
        file.write_line("still before").unwrap();
        *now.lock().unwrap() = start + Duration::seconds(61);
        file.write_line("after").unwrap();

        let backup = dir.path().join("app.log.2024-05-01_10-00");
        assert_eq!(read(&backup), "before\nstill before\n");
        assert_eq!(read(&path), "after\n");
    }

    #[test]
    fn test_time_rotation_prunes_old_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let start = Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let (clock, now) = manual_clock(start);
        let policy = RotationPolicy::TimeBased {
            unit: TimeUnit::Seconds,
            interval: 10,
            backup_count: 2,
        };
        let mut file = RotatingFile::with_clock(&path, policy, clock).unwrap();

        for step in 0..5 {
            *now.lock().unwrap() = start + Duration::seconds(step * 10);
            file.write_line(&format!("segment {step}")).unwrap();
        }

        let mut backups: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|n| n != "app.log")
            .collect();
        backups.sort();

        assert_eq!(
            backups,
            vec![
                "app.log.2024-05-01_10-00-20".to_string(),
                "app.log.2024-05-01_10-00-30".to_string()
            ]
        );
        assert_eq!(read(&path), "segment 4\n");
    }

    #[test]
    fn test_midnight_rotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let start = Local.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap();
        let (clock, now) = manual_clock(start);
        let policy = RotationPolicy::TimeBased {
            unit: TimeUnit::Midnight,
            interval: 1,
            backup_count: 7,
        };
        let mut file = RotatingFile::with_clock(&path, policy, clock).unwrap();

        file.write_line("late").unwrap();
        *now.lock().unwrap() = Local.with_ymd_and_hms(2024, 5, 2, 0, 0, 1).unwrap();
        file.write_line("early").unwrap();

        assert_eq!(read(&dir.path().join("app.log.2024-05-01")), "late\n");
        assert_eq!(read(&path), "early\n");
    }
}
