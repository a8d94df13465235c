//! Per-entity status history stored as CSV files
//!
//! Every site and group owns one file under the logs directory. Each run
//! prunes entries older than the retention window and appends a new entry
//! only when the status changed or the run falls in a daily heartbeat
//! window. Files are always replaced atomically.

use crate::errors::{CollectorError, Result};
use crate::log_format::{parse_log, render_log};
use crate::status::{Status, StatusEntry};
use chrono::{DateTime, TimeDelta, Timelike, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Entries strictly older than this many days before `now` are dropped.
pub const RETENTION_DAYS: i64 = 45;

pub const LOG_EXTENSION: &str = "csv";

/// What a single `record` call did to an entity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub appended: bool,
    pub pruned: usize,
    pub retained: usize,
}

/// Directory of entity logs keyed by slug
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
    retention: TimeDelta,
}

impl LogStore {
    /// Open the store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| CollectorError::log_write(&dir, e))?;

        Ok(Self {
            dir,
            retention: TimeDelta::days(RETENTION_DAYS),
        })
    }

    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", slug, LOG_EXTENSION))
    }

    /// Record the status observed for `slug` at `now`.
    ///
    /// Loads the log (creating a header-only file on first use), applies
    /// retention, decides whether to append, and persists the result.
    pub fn record(&self, slug: &str, now: DateTime<Utc>, status: Status) -> Result<RecordOutcome> {
        let path = self.path_for(slug);
        self.ensure_log(&path)?;

        let mut entries = self.read_path(&path)?;
        let pruned = prune_expired(&mut entries, now, self.retention);

        let mut appended = should_append(&entries, now, status);
        if let Some(last) = entries.last() {
            if appended && now < last.time {
                warn!(
                    "Clock is behind the newest entry of {} ({} < {}), not appending",
                    slug,
                    now,
                    last.time
                );
                appended = false;
            }
        }

        if appended {
            entries.push(StatusEntry::new(now, status));
        }

        self.write_path(&path, &entries)?;

        debug!(
            slug,
            status = %status,
            appended,
            pruned,
            retained = entries.len(),
            "Recorded status"
        );

        Ok(RecordOutcome {
            appended,
            pruned,
            retained: entries.len(),
        })
    }

    /// Read the stored history for `slug`; a log that does not exist yet is empty
    pub fn read(&self, slug: &str) -> Result<Vec<StatusEntry>> {
        self.read_path(&self.path_for(slug))
    }

    /// Replace the stored history for `slug`
    pub fn write(&self, slug: &str, entries: &[StatusEntry]) -> Result<()> {
        self.write_path(&self.path_for(slug), entries)
    }

    /// Create a header-only log at `path` unless one already exists.
    ///
    /// The header is written to a temp file and linked into place without
    /// clobbering, so a concurrent creator never truncates an existing log.
    fn ensure_log(&self, path: &Path) -> Result<()> {
        if path.is_file() {
            return Ok(());
        }

        let tmp = self.temp_file_with(path, &[], None)?;
        match tmp.persist_noclobber(path) {
            Ok(_) => {
                debug!("Created log {}", path.display());
                Ok(())
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(CollectorError::log_write(path, e.error)),
        }
    }

    fn read_path(&self, path: &Path) -> Result<Vec<StatusEntry>> {
        match fs::read_to_string(path) {
            Ok(content) => parse_log(path, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                Err(CollectorError::corruption(path, 0, "log is not valid UTF-8"))
            }
            Err(e) => Err(CollectorError::Io(e)),
        }
    }

    fn write_path(&self, path: &Path, entries: &[StatusEntry]) -> Result<()> {
        let existing = fs::metadata(path).ok().map(|m| m.permissions());
        let tmp = self.temp_file_with(path, entries, existing)?;

        tmp.persist(path)
            .map_err(|e| CollectorError::log_write(path, e.error))?;

        Ok(())
    }

    fn temp_file_with(
        &self,
        path: &Path,
        entries: &[StatusEntry],
        permissions: Option<fs::Permissions>,
    ) -> Result<NamedTempFile> {
        let write_err = |e: std::io::Error| CollectorError::log_write(path, e);

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(render_log(entries).as_bytes()).map_err(write_err)?;
        match permissions {
            Some(perms) => tmp.as_file().set_permissions(perms).map_err(write_err)?,
            None => set_default_permissions(tmp.as_file()).map_err(write_err)?,
        }
        tmp.as_file().sync_all().map_err(write_err)?;

        Ok(tmp)
    }
}

// Temp files are created owner-only; logs are read by a separate renderer.
#[cfg(unix)]
fn set_default_permissions(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_file: &File) -> std::io::Result<()> {
    Ok(())
}

/// First or last ten minutes of the UTC day
pub fn is_heartbeat(now: DateTime<Utc>) -> bool {
    (now.hour() == 0 && now.minute() < 10) || (now.hour() == 23 && now.minute() >= 50)
}

/// Drop entries older than `now - retention`, keeping the boundary itself.
/// Returns the number of entries removed.
pub fn prune_expired(entries: &mut Vec<StatusEntry>, now: DateTime<Utc>, retention: TimeDelta) -> usize {
    let cutoff = now - retention;
    let before = entries.len();
    entries.retain(|entry| entry.time >= cutoff);
    before - entries.len()
}

/// Whether a run at `now` observing `status` produces a new entry
pub fn should_append(history: &[StatusEntry], now: DateTime<Utc>, status: Status) -> bool {
    if is_heartbeat(now) {
        return true;
    }

    match history.last() {
        None => true,
        Some(last) => last.status != status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, h, m, 0).unwrap()
    }

    #[test]
    fn test_example_scenario() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();

        let outcome = store.record("api", at(1, 0, 5), Status::Success).unwrap();
        assert!(outcome.appended);
        assert_eq!(
            fs::read_to_string(store.path_for("api")).unwrap(),
            "time,status\n2024-01-01T00:05:00Z,success\n"
        );

        let outcome = store.record("api", at(1, 12, 0), Status::Success).unwrap();
        assert!(!outcome.appended);
        assert_eq!(store.read("api").unwrap().len(), 1);

        let outcome = store.record("api", at(1, 13, 0), Status::Error).unwrap();
        assert!(outcome.appended);
        assert_eq!(outcome.retained, 2);
        assert_eq!(
            fs::read_to_string(store.path_for("api")).unwrap(),
            "time,status\n2024-01-01T00:05:00Z,success\n2024-01-01T13:00:00Z,error\n"
        );
    }

    #[test]
    fn test_first_observation_is_recorded_outside_heartbeat() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();

        let outcome = store.record("api", at(1, 12, 0), Status::Success).unwrap();
        assert!(outcome.appended);
        assert_eq!(
            store.read("api").unwrap(),
            vec![StatusEntry::new(at(1, 12, 0), Status::Success)]
        );
    }

    #[test]
    fn test_steady_state_is_coalesced() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        store.record("api", at(1, 12, 0), Status::Error).unwrap();
        let before = fs::read_to_string(store.path_for("api")).unwrap();

        for hour in 13..23 {
            let outcome = store.record("api", at(1, hour, 30), Status::Error).unwrap();
            assert!(!outcome.appended);
        }

        assert_eq!(fs::read_to_string(store.path_for("api")).unwrap(), before);
    }

    #[test]
    fn test_transition_always_appended() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        store.record("api", at(1, 12, 0), Status::Success).unwrap();

        assert!(store.record("api", at(1, 12, 1), Status::Error).unwrap().appended);
        assert!(store.record("api", at(1, 12, 2), Status::Success).unwrap().appended);
        assert_eq!(store.read("api").unwrap().len(), 3);
    }

    #[test]
    fn test_heartbeat_windows_record_identical_status() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();

        assert!(store.record("api", at(1, 0, 5), Status::Success).unwrap().appended);
        assert!(!store.record("api", at(1, 12, 0), Status::Success).unwrap().appended);
        assert!(store.record("api", at(1, 23, 55), Status::Success).unwrap().appended);
        assert!(store.record("api", at(2, 0, 5), Status::Success).unwrap().appended);

        let days: Vec<u32> = store
            .read("api")
            .unwrap()
            .iter()
            .map(|e| chrono::Datelike::day(&e.time))
            .collect();
        assert_eq!(days, vec![1, 1, 2]);
    }

    #[test]
    fn test_heartbeat_window_edges() {
        assert!(is_heartbeat(at(1, 0, 0)));
        assert!(is_heartbeat(Utc.with_ymd_and_hms(2024, 1, 1, 0, 9, 59).unwrap()));
        assert!(!is_heartbeat(at(1, 0, 10)));
        assert!(!is_heartbeat(at(1, 23, 49)));
        assert!(is_heartbeat(at(1, 23, 50)));
        assert!(is_heartbeat(Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap()));
        assert!(!is_heartbeat(at(1, 12, 5)));
    }

    #[test]
    fn test_retention_keeps_boundary() {
        let now = at(31, 12, 0);
        let boundary = now - TimeDelta::days(RETENTION_DAYS);
        let mut entries = vec![
            StatusEntry::new(boundary - TimeDelta::seconds(1), Status::Error),
            StatusEntry::new(boundary, Status::Success),
            StatusEntry::new(now - TimeDelta::days(1), Status::Error),
        ];

        let pruned = prune_expired(&mut entries, now, TimeDelta::days(RETENTION_DAYS));

        assert_eq!(pruned, 1);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].time, boundary);
    }

    #[test]
    fn test_record_prunes_expired_entries() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        let now = at(31, 12, 0);
        store
            .write(
                "api",
                &[
                    StatusEntry::new(now - TimeDelta::days(60), Status::Error),
                    StatusEntry::new(now - TimeDelta::days(46), Status::Success),
                    StatusEntry::new(now - TimeDelta::days(10), Status::Success),
                ],
            )
            .unwrap();

        let outcome = store.record("api", now, Status::Success).unwrap();

        assert_eq!(outcome.pruned, 2);
        assert!(!outcome.appended);
        let entries = store.read("api").unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.iter().all(|e| e.time >= now - TimeDelta::days(RETENTION_DAYS)));
    }

    #[test]
    fn test_fully_expired_history_counts_as_empty() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        let now = at(31, 12, 0);
        store
            .write("api", &[StatusEntry::new(now - TimeDelta::days(50), Status::Success)])
            .unwrap();

        let outcome = store.record("api", now, Status::Success).unwrap();

        assert!(outcome.appended);
        assert_eq!(store.read("api").unwrap(), vec![StatusEntry::new(now, Status::Success)]);
    }

    #[test]
    fn test_write_then_read_preserves_entries() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        let entries: Vec<StatusEntry> = (0..24)
            .map(|h| {
                let status = if h % 3 == 0 { Status::Error } else { Status::Success };
                StatusEntry::new(at(2, h, 17), status)
            })
            .collect();

        store.write("api", &entries).unwrap();

        assert_eq!(store.read("api").unwrap(), entries);
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();

        assert!(store.read("never-seen").unwrap().is_empty());
        assert!(!store.path_for("never-seen").exists());
    }

    #[test]
    fn test_existing_log_is_not_clobbered_on_open() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        let path = store.path_for("api");
        fs::write(&path, "time,status\n2024-01-01T11:00:00Z,error\n").unwrap();

        store.ensure_log(&path).unwrap();

        assert_eq!(store.read("api").unwrap().len(), 1);
    }

    #[test]
    fn test_header_only_log_is_accepted() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        let path = store.path_for("api");
        store.ensure_log(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "time,status\n");

        let outcome = store.record("api", at(1, 12, 0), Status::Error).unwrap();
        assert!(outcome.appended);
    }

    #[test]
    fn test_corrupted_log_is_fatal_and_untouched() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        let path = store.path_for("api");
        let corrupted = "time,status\nnot-a-time,success\n";
        fs::write(&path, corrupted).unwrap();

        let err = store.record("api", at(1, 12, 0), Status::Error).unwrap_err();

        assert!(matches!(err, CollectorError::LogCorruption { line: 2, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), corrupted);
    }

    #[test]
    fn test_non_utf8_log_is_corruption() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        fs::write(store.path_for("api"), [0xff, 0xfe]).unwrap();

        let err = store.record("api", at(1, 12, 0), Status::Success).unwrap_err();

        assert!(matches!(err, CollectorError::LogCorruption { line: 0, .. }));
        assert_eq!(fs::read(store.path_for("api")).unwrap(), vec![0xff, 0xfe]);
    }

    #[test]
    fn test_clock_behind_newest_entry_does_not_append() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        store.record("api", at(2, 12, 0), Status::Success).unwrap();

        let outcome = store.record("api", at(1, 12, 0), Status::Error).unwrap();

        assert!(!outcome.appended);
        assert_eq!(store.read("api").unwrap().len(), 1);
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("nested").join("logs");

        let store = LogStore::open(&logs).unwrap();

        assert!(logs.is_dir());
        assert_eq!(store.path_for("api"), logs.join("api.csv"));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        store.record("api", at(1, 0, 5), Status::Success).unwrap();
        store.record("web", at(1, 0, 5), Status::Error).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["api.csv", "web.csv"]);
    }
}
