//! File sinks with size-based rotation and age/count retention.
//!
//! This module provides:
//! - [`RotatingSink`]: Destination trait used by the router
//! - [`SinkSpec`]: Rotation and retention settings for one bucket
//! - [`FileSink`]: Append-only file that rolls over when full
//!
//! Rotated files are renamed to `<stem>-<timestamp>.<ext>` next to the active
//! file, with the timestamp in UTC as `YYYY-MM-DDTHH-MM-SS.mmm`. After every
//! rotation old backups are pruned and, if enabled, gzip-compressed.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{LogError, Result};

const MEGABYTE: u64 = 1024 * 1024;

/// Rotation threshold used when none is configured.
pub const DEFAULT_MAX_SIZE: u64 = 100 * MEGABYTE;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const BACKUP_TIME_LEN: usize = "2006-01-02T15-04-05.000".len();
const COMPRESS_SUFFIX: &str = ".gz";

/// A destination for encoded records.
///
/// Implementations must serialize concurrent writers: a record is written
/// whole or not at all, and never split across a rotation.
pub trait RotatingSink: Send + Sync {
    /// Writes one complete record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn write(&self, record: &[u8]) -> Result<usize>;

    /// Flushes written records to stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn sync(&self) -> Result<()>;

    /// Returns the path of the active file.
    fn path(&self) -> &Path;
}

/// Rotation and retention settings for one sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    /// Path of the active log file.
    pub file_path: PathBuf,
    /// Size in bytes at which the file is rotated. `0` uses [`DEFAULT_MAX_SIZE`].
    pub max_size: u64,
    /// Number of rotated files to keep. `0` keeps all.
    pub max_backups: usize,
    /// Days to keep rotated files. `0` disables age-based removal.
    pub max_age_days: u64,
    /// Whether rotated files are gzip-compressed.
    pub compress: bool,
}

impl SinkSpec {
    /// Creates a spec for `file_path` with default rotation and no retention limits.
    #[must_use]
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            max_size: 0,
            max_backups: 0,
            max_age_days: 0,
            compress: false,
        }
    }

    /// Sets the rotation threshold in megabytes.
    #[must_use]
    pub const fn with_max_size_mb(mut self, megabytes: u64) -> Self {
        self.max_size = megabytes.saturating_mul(MEGABYTE);
        self
    }

    /// Sets the rotation threshold in bytes.
    #[must_use]
    pub const fn with_max_size_bytes(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Sets the number of rotated files to keep.
    #[must_use]
    pub const fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    /// Sets the number of days rotated files are kept.
    #[must_use]
    pub const fn with_max_age_days(mut self, days: u64) -> Self {
        self.max_age_days = days;
        self
    }

    /// Enables or disables compression of rotated files.
    #[must_use]
    pub const fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Returns the effective rotation threshold in bytes.
    #[must_use]
    pub const fn max_bytes(&self) -> u64 {
        if self.max_size == 0 {
            DEFAULT_MAX_SIZE
        } else {
            self.max_size
        }
    }
}

/// Internal state for the active file.
struct FileState {
    /// Open handle, `None` until the first write or after `close`.
    file: Option<File>,
    /// Bytes currently in the active file.
    size: u64,
}

/// A rotated file found next to the active one.
#[derive(Debug)]
struct Backup {
    path: PathBuf,
    timestamp: DateTime<Utc>,
    /// Disambiguates rotations within the same millisecond.
    seq: u32,
    compressed: bool,
}

/// Append-only log file that rotates when it reaches its size limit.
pub struct FileSink {
    spec: SinkSpec,
    state: Mutex<FileState>,
    /// Serializes retention passes, which run outside `state`.
    prune_lock: Mutex<()>,
}

impl FileSink {
    /// Creates a sink. The file is opened lazily on the first write.
    #[must_use]
    pub fn new(spec: SinkSpec) -> Self {
        Self {
            spec,
            state: Mutex::new(FileState {
                file: None,
                size: 0,
            }),
            prune_lock: Mutex::new(()),
        }
    }

    /// Returns the sink's settings.
    #[must_use]
    pub const fn spec(&self) -> &SinkSpec {
        &self.spec
    }

    /// Appends one record, rotating first if it would not fit.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::RecordTooLarge`] if the record alone exceeds the
    /// rotation threshold, or an I/O error if writing or rotating fails.
    pub fn write(&self, record: &[u8]) -> Result<usize> {
        let len = record.len() as u64;
        let max = self.spec.max_bytes();
        if len > max {
            return Err(LogError::RecordTooLarge { len, max });
        }

        let mut state = self.state.lock();
        let rotated = if state.file.is_none() {
            self.open_existing_or_new(&mut state, len)?
        } else if state.size + len > max {
            self.rotate_locked(&mut state)?
        } else {
            false
        };
        let appended = append(&mut state, record);
        drop(state);

        // Retention runs outside the write lock.
        if rotated {
            self.prune();
        }
        appended.map(|()| record.len())
    }

    /// Closes the active file and starts a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if rotation fails.
    pub fn rotate(&self) -> Result<()> {
        let mut state = self.state.lock();
        let rotated = self.rotate_locked(&mut state)?;
        drop(state);
        if rotated {
            self.prune();
        }
        Ok(())
    }

    /// Flushes the active file to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn sync(&self) -> Result<()> {
        let state = self.state.lock();
        if let Some(ref file) = state.file {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Flushes and closes the active file. The next write reopens it.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(file) = state.file.take() {
            file.sync_all()?;
        }
        state.size = 0;
        Ok(())
    }

    /// Returns the rotated files currently on disk, newest first.
    #[must_use]
    pub fn backups(&self) -> Vec<PathBuf> {
        self.list_backups().into_iter().map(|b| b.path).collect()
    }

    // ========== Internal Methods ==========

    /// Opens the active file, returning true if an old file was moved aside.
    fn open_existing_or_new(&self, state: &mut FileState, incoming: u64) -> Result<bool> {
        let path = &self.spec.file_path;
        let existing = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.open_new(state),
            Err(e) => return Err(e.into()),
        };

        if existing + incoming > self.spec.max_bytes() {
            return self.rotate_locked(state);
        }

        match OpenOptions::new().append(true).open(path) {
            Ok(file) => {
                state.file = Some(file);
                state.size = existing;
                Ok(false)
            }
            // Unreadable leftovers are moved aside rather than blocking logging.
            Err(_) => self.open_new(state),
        }
    }

    /// Starts an empty active file, returning true if a previous one became a
    /// backup.
    fn open_new(&self, state: &mut FileState) -> Result<bool> {
        let path = &self.spec.file_path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let moved = path.exists();
        if moved {
            let backup = self.backup_path(Utc::now());
            fs::rename(path, &backup)?;
            debug!(from = %path.display(), to = %backup.display(), "rotated log file");
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        state.file = Some(file);
        state.size = 0;
        Ok(moved)
    }

    /// Moves the active file aside. The caller prunes once the lock is released.
    fn rotate_locked(&self, state: &mut FileState) -> Result<bool> {
        if let Some(file) = state.file.take() {
            file.sync_all()?;
        }
        self.open_new(state)
    }

    /// Splits the active file name into `(stem, extension)`, the extension
    /// keeping its leading dot.
    fn name_parts(&self) -> (String, String) {
        let path = &self.spec.file_path;
        let stem = path
            .file_stem()
            .map_or_else(|| "teelog".to_string(), |s| s.to_string_lossy().into_owned());
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (stem, ext)
    }

    fn dir(&self) -> PathBuf {
        match self.spec.file_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn backup_path(&self, now: DateTime<Utc>) -> PathBuf {
        let (stem, ext) = self.name_parts();
        let timestamp = now.format(BACKUP_TIME_FORMAT);
        let dir = self.dir();

        let mut candidate = dir.join(format!("{stem}-{timestamp}{ext}"));
        let mut seq = 1u32;
        while candidate.exists() || with_suffix(&candidate, COMPRESS_SUFFIX).exists() {
            candidate = dir.join(format!("{stem}-{timestamp}-{seq}{ext}"));
            seq += 1;
        }
        candidate
    }

    fn parse_backup(&self, path: &Path) -> Option<Backup> {
        let (stem, ext) = self.name_parts();
        let name = path.file_name()?.to_str()?;
        let (name, compressed) = match name.strip_suffix(COMPRESS_SUFFIX) {
            Some(inner) => (inner, true),
            None => (name, false),
        };
        let rest = name.strip_prefix(&stem)?.strip_prefix('-')?;
        let rest = rest.strip_suffix(ext.as_str())?;
        let stamp = rest.get(..BACKUP_TIME_LEN)?;
        let naive = NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT).ok()?;
        let seq = match &rest[BACKUP_TIME_LEN..] {
            "" => 0,
            tail => tail.strip_prefix('-')?.parse().ok()?,
        };
        Some(Backup {
            path: path.to_path_buf(),
            timestamp: naive.and_utc(),
            seq,
            compressed,
        })
    }

    fn list_backups(&self) -> Vec<Backup> {
        let Ok(entries) = fs::read_dir(self.dir()) else {
            return Vec::new();
        };
        let mut backups: Vec<Backup> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter_map(|p| self.parse_backup(&p))
            .collect();
        backups.sort_by(|a, b| (b.timestamp, b.seq).cmp(&(a.timestamp, a.seq)));
        backups
    }

    /// Applies count and age retention, then compresses what is left.
    ///
    /// Failures are logged and skipped; pruning never fails a write.
    fn prune(&self) {
        let _pruning = self.prune_lock.lock();
        let mut backups = self.list_backups();
        let mut expired = Vec::new();

        if self.spec.max_backups > 0 && backups.len() > self.spec.max_backups {
            expired.extend(backups.split_off(self.spec.max_backups));
        }

        let cutoff = i64::try_from(self.spec.max_age_days)
            .ok()
            .filter(|days| *days > 0)
            .and_then(Duration::try_days)
            .and_then(|age| Utc::now().checked_sub_signed(age));
        if let Some(cutoff) = cutoff {
            let (keep, old): (Vec<_>, Vec<_>) =
                backups.into_iter().partition(|b| b.timestamp >= cutoff);
            backups = keep;
            expired.extend(old);
        }

        for backup in expired {
            if let Err(e) = fs::remove_file(&backup.path) {
                warn!(path = %backup.path.display(), error = %e, "failed to remove expired log file");
            }
        }

        if self.spec.compress {
            for backup in backups.iter().filter(|b| !b.compressed) {
                if let Err(e) = compress_file(&backup.path) {
                    warn!(path = %backup.path.display(), error = %e, "failed to compress log file");
                }
            }
        }
    }
}

impl RotatingSink for FileSink {
    fn write(&self, record: &[u8]) -> Result<usize> {
        FileSink::write(self, record)
    }

    fn sync(&self) -> Result<()> {
        FileSink::sync(self)
    }

    fn path(&self) -> &Path {
        &self.spec.file_path
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink").field("spec", &self.spec).finish_non_exhaustive()
    }
}

fn append(state: &mut FileState, record: &[u8]) -> Result<()> {
    let FileState { file, size } = state;
    let Some(file) = file.as_mut() else {
        return Err(io::Error::other("log file is not open").into());
    };
    file.write_all(record)?;
    *size += record.len() as u64;
    Ok(())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Gzips `src` into `src.gz` and removes `src`.
fn compress_file(src: &Path) -> io::Result<()> {
    let dst = with_suffix(src, COMPRESS_SUFFIX);
    match gzip_into(src, &dst) {
        Ok(()) => fs::remove_file(src),
        Err(e) => {
            let _ = fs::remove_file(&dst);
            Err(e)
        }
    }
}

fn gzip_into(src: &Path, dst: &Path) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(src)?);
    let out = File::create(dst)?;
    let mut encoder = GzEncoder::new(BufWriter::new(out), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    let writer = encoder.finish()?;
    writer
        .into_inner()
        .map_err(io::IntoInnerError::into_error)?
        .sync_all()
}
