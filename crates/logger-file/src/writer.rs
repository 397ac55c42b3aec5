//! Append-only rotating destinations

use crate::config::LogFile;
use crate::error::{Error, Result};
use logroller::{Compression, LogRoller, LogRollerBuilder, Rotation, RotationSize};
use parking_lot::Mutex;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, trace};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// A destination that formatted entries are appended to.
///
/// Implementations must make each `append` atomic with respect to other
/// appends on the same writer: two concurrent calls never interleave bytes.
pub trait LogWriter: Send + Sync + fmt::Debug {
    /// Path of the active file, used to identify the destination in errors
    fn path(&self) -> &Path;

    /// Append the whole buffer
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the failed write.
    fn append(&self, buf: &[u8]) -> io::Result<()>;

    /// Flush buffered bytes to disk
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the failed flush.
    fn flush(&self) -> io::Result<()>;
}

/// Canonical directory and file name of a log file.
///
/// Two spellings of the same file (`logs/app.log`, `./logs/app.log`,
/// `logs/sub/../app.log`) resolve to equal locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Location {
    directory: PathBuf,
    file_name: String,
}

impl Location {
    /// Create the parent directory of `path` if needed and canonicalize it
    pub(crate) fn resolve(path: &Path) -> Result<Self> {
        let config_error = |reason: String| Error::Configuration {
            path: path.to_path_buf(),
            reason,
        };

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| config_error("file name is missing or not valid UTF-8".to_string()))?
            .to_string();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        fs::create_dir_all(parent).map_err(|e| {
            config_error(format!("cannot create directory {}: {e}", parent.display()))
        })?;
        let directory = fs::canonicalize(parent).map_err(|e| {
            config_error(format!("cannot resolve directory {}: {e}", parent.display()))
        })?;

        Ok(Self {
            directory,
            file_name,
        })
    }

    /// Whether `other` would collide with one of this file's rotated backups
    pub(crate) fn shadows_backups_of(&self, other: &Self) -> bool {
        self.directory == other.directory && is_backup_name(&other.file_name, &self.file_name)
    }

    pub(crate) fn directory(&self) -> &Path {
        &self.directory
    }

    pub(crate) fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Whether `candidate` names a rotated backup of `file_name`.
///
/// Backups are `<file_name>.<suffix>` with an optional `.gz`, where the
/// suffix is a rotation index or a date stamp: digits and dashes only.
pub(crate) fn is_backup_name(file_name: &str, candidate: &str) -> bool {
    let Some(suffix) = candidate
        .strip_prefix(file_name)
        .and_then(|rest| rest.strip_prefix('.'))
    else {
        return false;
    };
    let suffix = suffix.strip_suffix(".gz").unwrap_or(suffix);

    suffix.starts_with(|c: char| c.is_ascii_digit())
        && suffix.chars().all(|c| c.is_ascii_digit() || c == '-')
}

/// Rotating file backed by `logroller`.
///
/// Rotates once the active file exceeds `max_size`, keeps at most
/// `max_backups` rotated files and gzips them when asked to. Rotated files
/// older than `max_age` days are swept when the writer opens and after
/// every `max_size` bytes appended.
pub struct RollingFileWriter {
    path: PathBuf,
    location: Location,
    max_size: u64,
    max_age: Option<Duration>,
    state: Mutex<State>,
}

struct State {
    roller: LogRoller,
    since_sweep: u64,
}

impl RollingFileWriter {
    /// Open (creating if needed) the file described by `file`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the directory or file cannot be
    /// created, or the path is not valid UTF-8.
    pub fn open(file: &LogFile) -> Result<Self> {
        let location = Location::resolve(&file.filename)?;
        Self::open_at(file, location)
    }

    /// Open `file` at an already resolved location
    pub(crate) fn open_at(file: &LogFile, location: Location) -> Result<Self> {
        let path = file.filename.clone();
        let config_error = |reason: String| Error::Configuration {
            path: path.clone(),
            reason,
        };

        let directory = location
            .directory
            .to_str()
            .ok_or_else(|| config_error("directory is not valid UTF-8".to_string()))?;

        // Surface permission problems now rather than on the first entry
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(location.directory.join(&location.file_name))
            .map_err(|e| config_error(e.to_string()))?;

        let rotation = RotationSize::MB(file.max_size_bytes() / (1024 * 1024));
        let mut builder = LogRollerBuilder::new(directory, location.file_name.as_str())
            .rotation(Rotation::SizeBased(rotation));
        if file.max_backups > 0 {
            builder = builder.max_keep_files(file.max_backups as _);
        }
        if file.compress {
            builder = builder.compression(Compression::Gzip);
        }
        let roller = builder.build().map_err(|e| config_error(e.to_string()))?;

        let max_age = (file.max_age > 0)
            .then(|| Duration::from_secs(u64::from(file.max_age) * SECONDS_PER_DAY));

        debug!(
            path = %path.display(),
            max_size = file.max_size_bytes(),
            max_backups = file.max_backups,
            max_age = file.max_age,
            compress = file.compress,
            "opened rotating log file"
        );

        let writer = Self {
            path,
            location,
            max_size: file.max_size_bytes(),
            max_age,
            state: Mutex::new(State {
                roller,
                since_sweep: 0,
            }),
        };
        writer.sweep_expired();

        Ok(writer)
    }

    /// Remove rotated backups older than `max_age`
    fn sweep_expired(&self) {
        let Some(max_age) = self.max_age else {
            return;
        };

        let directory = self.location.directory();
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                trace!(directory = %directory.display(), error = %e, "cannot list log directory");
                return;
            }
        };

        let now = SystemTime::now();

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_backup_name(self.location.file_name(), name) {
                continue;
            }

            let expired = entry
                .metadata()
                .and_then(|metadata| metadata.modified())
                .is_ok_and(|modified| now.duration_since(modified).unwrap_or_default() > max_age);
            if !expired {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => trace!(path = %entry.path().display(), "removed expired log backup"),
                Err(e) => {
                    trace!(path = %entry.path().display(), error = %e, "cannot remove log backup");
                }
            }
        }
    }
}

impl LogWriter for RollingFileWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        state.roller.write_all(buf)?;
        state.roller.flush()?;

        state.since_sweep = state.since_sweep.saturating_add(buf.len() as u64);
        if state.since_sweep >= self.max_size {
            state.since_sweep = 0;
            self.sweep_expired();
        }

        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        self.state.lock().roller.flush()
    }
}

impl fmt::Debug for RollingFileWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingFileWriter")
            .field("path", &self.path)
            .field("max_size", &self.max_size)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}
