//! Persistence of the "last attempted run" timestamp.
//!
//! A single fractional Unix timestamp, overwritten wholesale after every
//! attempted extend step. It marks "we got far enough", not strict success:
//! a timed-out reload still counts, because the click may well have
//! registered server-side.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::clock::Clock;

/// How long since the last run before the checker reports overdue (60 days).
pub const OVERDUE_AFTER: Duration = Duration::from_secs(60 * 24 * 60 * 60);

/// Reads and writes the last-run timestamp file.
#[derive(Debug, Clone)]
pub struct LastRunStore {
    path: PathBuf,
}

impl LastRunStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with the current time, creating parent
    /// directories as needed.
    pub fn record(&self, clock: &dyn Clock) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let stamp = format!("{:.6}", clock.unix_seconds());
        std::fs::write(&self.path, stamp)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Unix seconds of the last run, or `None` if no run is recorded.
    pub fn last_run_at(&self) -> Result<Option<f64>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let seconds: f64 = content
            .trim()
            .parse()
            .with_context(|| format!("Invalid timestamp in {}", self.path.display()))?;
        Ok(Some(seconds))
    }

    /// Time elapsed since the last run, or `None` if no run is recorded.
    pub fn age(&self, clock: &dyn Clock) -> Result<Option<Duration>> {
        Ok(self
            .last_run_at()?
            .map(|at| Duration::from_secs_f64((clock.unix_seconds() - at).max(0.0))))
    }

    /// Whether more than `threshold` has elapsed since the last run. A
    /// missing record counts as overdue.
    pub fn is_overdue(&self, clock: &dyn Clock, threshold: Duration) -> Result<bool> {
        Ok(match self.age(clock)? {
            Some(age) => age > threshold,
            None => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;

    fn store_with(dir: &TempDir, contents: &str) -> LastRunStore {
        let path = dir.path().join("last_run.txt");
        std::fs::write(&path, contents).unwrap();
        LastRunStore::new(path)
    }

    #[test]
    fn overdue_after_sixty_days() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, &format!("{}", NOW - 5_184_001));
        let clock = FixedClock::at_unix(NOW);
        assert!(store.is_overdue(&clock, OVERDUE_AFTER).unwrap());
    }

    #[test]
    fn recent_run_is_not_overdue() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, &format!("{}", NOW - 100));
        let clock = FixedClock::at_unix(NOW);
        assert!(!store.is_overdue(&clock, OVERDUE_AFTER).unwrap());
    }

    #[test]
    fn missing_record_is_overdue() {
        let dir = TempDir::new().unwrap();
        let store = LastRunStore::new(dir.path().join("last_run.txt"));
        let clock = FixedClock::at_unix(NOW);
        assert!(store.is_overdue(&clock, OVERDUE_AFTER).unwrap());
        assert!(store.age(&clock).unwrap().is_none());
    }

    #[test]
    fn fractional_timestamps_parse() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, "1700000000.123456\n");
        assert_eq!(store.last_run_at().unwrap(), Some(1_700_000_000.123456));
    }

    #[test]
    fn garbage_contents_are_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, "not-a-timestamp");
        assert!(store.last_run_at().is_err());
    }

    #[test]
    fn record_round_trips_through_the_file() {
        let dir = TempDir::new().unwrap();
        let store = LastRunStore::new(dir.path().join("nested").join("last_run.txt"));
        let clock = FixedClock::at_unix(NOW);

        store.record(&clock).unwrap();
        assert_eq!(store.age(&clock).unwrap(), Some(Duration::ZERO));
    }

    #[test]
    fn record_overwrites_previous_value() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, "1.0");
        store.record(&FixedClock::at_unix(NOW)).unwrap();
        assert_eq!(store.last_run_at().unwrap(), Some(NOW as f64));
    }
}
