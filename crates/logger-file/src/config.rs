//! Configuration for file hooks

use proven_logger::{Formatter, JsonFormatter, Level, TextFormatter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Rotation threshold used when `max_size` is left at zero, in megabytes.
pub(crate) const DEFAULT_MAX_SIZE_MB: u64 = 100;

/// One rotating destination file.
///
/// Zero values mean "use the default": 100 MB before rotation, keep every
/// backup, never delete backups for age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct LogFile {
    /// Path of the active log file
    pub filename: PathBuf,
    /// Size in megabytes before the file is rotated
    #[serde(default)]
    pub max_size: u64,
    /// Number of rotated files to keep
    #[serde(default)]
    pub max_backups: u32,
    /// Days to keep rotated files
    #[serde(default)]
    pub max_age: u32,
    /// Gzip rotated files
    #[serde(default)]
    pub compress: bool,
}

impl LogFile {
    /// A destination with default limits
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            max_size: 0,
            max_backups: 0,
            max_age: 0,
            compress: false,
        }
    }

    /// Set the rotation threshold in megabytes
    #[must_use]
    pub const fn max_size(mut self, megabytes: u64) -> Self {
        self.max_size = megabytes;
        self
    }

    /// Set how many rotated files to keep
    #[must_use]
    pub const fn max_backups(mut self, backups: u32) -> Self {
        self.max_backups = backups;
        self
    }

    /// Set how many days rotated files are kept
    #[must_use]
    pub const fn max_age(mut self, days: u32) -> Self {
        self.max_age = days;
        self
    }

    /// Gzip rotated files
    #[must_use]
    pub const fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Path of the active log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.filename
    }

    /// Rotation threshold in bytes, with the default applied
    #[must_use]
    pub const fn max_size_bytes(&self) -> u64 {
        let megabytes = if self.max_size == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            self.max_size
        };
        megabytes.saturating_mul(1024 * 1024)
    }
}

/// Dedicated destinations keyed by the exact level they receive.
pub type LevelFileMap = HashMap<Level, LogFile>;

/// Which stock formatter a configured hook uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// `key=value` lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FormatKind {
    /// Build the formatter
    #[must_use]
    pub fn formatter(self) -> Arc<dyn Formatter> {
        match self {
            Self::Text => Arc::new(TextFormatter::new()),
            Self::Json => Arc::new(JsonFormatter::new()),
        }
    }
}

/// Deserializable description of a whole [`FileHook`](crate::FileHook).
///
/// ```toml
/// min_level = "debug"
/// format = "json"
///
/// [default]
/// filename = "/var/log/app/app.log"
/// max_size = 50
/// max_backups = 3
///
/// [levels.error]
/// filename = "/var/log/app/error.log"
/// compress = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileHookConfig {
    /// Destination receiving every entry the hook is fired with
    pub default: LogFile,
    /// Least severe level the hook is fired for
    #[serde(default = "default_min_level")]
    pub min_level: Level,
    /// Formatter used for every destination
    #[serde(default)]
    pub format: FormatKind,
    /// Additional destinations for exact levels
    #[serde(default)]
    pub levels: Option<LevelFileMap>,
}

const fn default_min_level() -> Level {
    Level::Info
}

impl FileHookConfig {
    /// Configuration with only a default destination
    pub fn new(default: LogFile) -> Self {
        Self {
            default,
            min_level: default_min_level(),
            format: FormatKind::default(),
            levels: None,
        }
    }

    /// Set the least severe level the hook is fired for
    #[must_use]
    pub const fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Set the formatter
    #[must_use]
    pub const fn format(mut self, format: FormatKind) -> Self {
        self.format = format;
        self
    }

    /// Add a dedicated destination for `level`
    #[must_use]
    pub fn level_file(mut self, level: Level, file: LogFile) -> Self {
        self.levels.get_or_insert_with(HashMap::new).insert(level, file);
        self
    }
}
