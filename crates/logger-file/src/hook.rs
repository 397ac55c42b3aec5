//! Level routing and the file hook

use crate::config::{FileHookConfig, LevelFileMap, LogFile};
use crate::error::{Error, Result, WriteErrors, WriteFailure};
use crate::writer::{Location, LogWriter, RollingFileWriter};
use proven_logger::{BoxError, Entry, Formatter, Hook, Level, LevelSet};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default writer plus optional dedicated writers keyed by exact level.
#[derive(Clone, Debug)]
pub struct LevelWriters {
    default: Arc<dyn LogWriter>,
    levels: Option<HashMap<Level, Arc<dyn LogWriter>>>,
}

impl LevelWriters {
    /// Wrap already opened writers
    ///
    /// An empty level map is treated like `None`.
    #[must_use]
    pub fn new(
        default: Arc<dyn LogWriter>,
        levels: Option<HashMap<Level, Arc<dyn LogWriter>>>,
    ) -> Self {
        Self {
            default,
            levels: levels.filter(|levels| !levels.is_empty()),
        }
    }

    /// Open one rotating writer per distinct file
    ///
    /// Levels naming the same file, or the default file, share its writer,
    /// however the path is spelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for the first file that cannot be
    /// opened, or that is named like a rotated backup of another file.
    pub fn open(default: &LogFile, levels: Option<&LevelFileMap>) -> Result<Self> {
        let mut opened = HashMap::new();
        let default = open_shared(&mut opened, default)?;

        let levels = levels
            .map(|levels| {
                levels
                    .iter()
                    .map(|(level, file)| Ok((*level, open_shared(&mut opened, file)?)))
                    .collect::<Result<HashMap<_, _>>>()
            })
            .transpose()?;

        Ok(Self::new(default, levels))
    }

    /// Writers receiving entries at `level`: always the default writer, then
    /// the writer dedicated to exactly `level` if there is one.
    pub fn writers_for(&self, level: Level) -> impl Iterator<Item = &Arc<dyn LogWriter>> {
        std::iter::once(&self.default).chain(self.dedicated_writer(level))
    }

    /// The writer every entry goes to
    #[must_use]
    pub const fn default_writer(&self) -> &Arc<dyn LogWriter> {
        &self.default
    }

    /// The writer dedicated to exactly `level`, unless it is the default writer
    #[must_use]
    pub fn dedicated_writer(&self, level: Level) -> Option<&Arc<dyn LogWriter>> {
        self.levels
            .as_ref()
            .and_then(|levels| levels.get(&level))
            .filter(|writer| !Arc::ptr_eq(*writer, &self.default))
    }

    /// Flush every distinct writer
    ///
    /// # Errors
    ///
    /// Returns every writer that failed to flush.
    pub fn flush(&self) -> std::result::Result<(), WriteErrors> {
        let mut flushed: Vec<&Arc<dyn LogWriter>> = vec![&self.default];
        for writer in self.levels.iter().flat_map(HashMap::values) {
            if !flushed.iter().any(|seen| Arc::ptr_eq(*seen, writer)) {
                flushed.push(writer);
            }
        }

        let failures: Vec<_> = flushed
            .into_iter()
            .filter_map(|writer| {
                writer.flush().err().map(|source| WriteFailure {
                    path: writer.path().to_path_buf(),
                    source,
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(WriteErrors::new(failures))
        }
    }
}

fn open_shared(
    opened: &mut HashMap<Location, Arc<dyn LogWriter>>,
    file: &LogFile,
) -> Result<Arc<dyn LogWriter>> {
    let location = Location::resolve(&file.filename)?;
    if let Some(writer) = opened.get(&location) {
        debug!(path = %file.filename.display(), "reusing rotating log file");
        return Ok(writer.clone());
    }

    // Rotation would rename another destination's backups over this file, or
    // the age sweep would delete it
    if let Some(other) = opened.keys().find(|other| {
        location.shadows_backups_of(other) || other.shadows_backups_of(&location)
    }) {
        return Err(Error::Configuration {
            path: file.filename.clone(),
            reason: format!(
                "collides with rotated backups of {}",
                other.directory().join(other.file_name()).display()
            ),
        });
    }

    let writer: Arc<dyn LogWriter> = Arc::new(RollingFileWriter::open_at(file, location.clone())?);
    opened.insert(location, writer.clone());
    Ok(writer)
}

/// Hook writing every entry at or above a minimum level to a default file,
/// and entries at specific levels to dedicated files as well.
///
/// ```no_run
/// use proven_logger::{HookLogger, Level, LoggerExt, TextFormatter};
/// use proven_logger_file::{FileHook, LevelFileMap, LogFile};
/// use std::sync::Arc;
///
/// let levels = LevelFileMap::from([(Level::Error, LogFile::new("/var/log/app/error.log"))]);
/// let hook = FileHook::new(
///     LogFile::new("/var/log/app/app.log").max_size(50).max_backups(3),
///     Level::Info,
///     Arc::new(TextFormatter::new()),
///     Some(levels),
/// )?;
///
/// let logger = HookLogger::new(Level::Trace).with_hook(Arc::new(hook));
/// logger.error("written to app.log and error.log");
/// # Ok::<(), proven_logger_file::Error>(())
/// ```
pub struct FileHook {
    min_level: Level,
    levels: LevelSet,
    formatter: Arc<dyn Formatter>,
    writers: LevelWriters,
}

impl FileHook {
    /// Open every destination and build the hook
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) if any
    /// destination cannot be opened; no hook is built in that case.
    pub fn new(
        default: LogFile,
        min_level: Level,
        formatter: Arc<dyn Formatter>,
        levels: Option<LevelFileMap>,
    ) -> Result<Self> {
        let writers = LevelWriters::open(&default, levels.as_ref())?;
        Ok(Self::with_writers(writers, min_level, formatter))
    }

    /// Build the hook described by `config`
    ///
    /// # Errors
    ///
    /// Same as [`FileHook::new`].
    pub fn from_config(config: &FileHookConfig) -> Result<Self> {
        let writers = LevelWriters::open(&config.default, config.levels.as_ref())?;
        Ok(Self::with_writers(
            writers,
            config.min_level,
            config.format.formatter(),
        ))
    }

    /// Build the hook around already opened writers
    #[must_use]
    pub fn with_writers(
        writers: LevelWriters,
        min_level: Level,
        formatter: Arc<dyn Formatter>,
    ) -> Self {
        Self {
            min_level,
            levels: LevelSet::at_or_above(min_level),
            formatter,
            writers,
        }
    }

    /// Least severe level the hook is fired for
    #[must_use]
    pub const fn min_level(&self) -> Level {
        self.min_level
    }

    /// The routing table
    #[must_use]
    pub const fn writers(&self) -> &LevelWriters {
        &self.writers
    }

    /// Format `entry` and append it to every writer routed for its level
    ///
    /// Does not consult [`Hook::levels`]; level filtering belongs to the
    /// logger firing the hook.
    ///
    /// # Errors
    ///
    /// - [`Error::Format`](crate::Error::Format) if the formatter fails;
    ///   nothing is written.
    /// - [`Error::Write`](crate::Error::Write) listing every writer that
    ///   failed. The other writers still received the entry.
    pub fn fire(&self, entry: &Entry) -> Result<()> {
        let bytes = self.formatter.format(entry)?;

        let failures: Vec<_> = self
            .writers
            .writers_for(entry.level)
            .filter_map(|writer| {
                writer.append(&bytes).err().map(|source| WriteFailure {
                    path: writer.path().to_path_buf(),
                    source,
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(WriteErrors::new(failures).into())
        }
    }
}

impl Hook for FileHook {
    fn levels(&self) -> LevelSet {
        self.levels
    }

    fn fire(&self, entry: &Entry) -> std::result::Result<(), BoxError> {
        Self::fire(self, entry).map_err(Into::into)
    }

    fn flush(&self) -> std::result::Result<(), BoxError> {
        self.writers.flush().map_err(Into::into)
    }
}

impl fmt::Debug for FileHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHook")
            .field("min_level", &self.min_level)
            .field("writers", &self.writers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::read_logs;
    use proven_logger::TextFormatter;
    use proven_logger::test_support::FailingFormatter;
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    /// Writer that fails every append and counts attempts
    #[derive(Debug)]
    struct BrokenWriter {
        path: PathBuf,
        attempts: AtomicUsize,
    }

    impl BrokenWriter {
        fn new(path: &str) -> Arc<Self> {
            Arc::new(Self {
                path: PathBuf::from(path),
                attempts: AtomicUsize::new(0),
            })
        }
    }

    impl LogWriter for BrokenWriter {
        fn path(&self) -> &Path {
            &self.path
        }

        fn append(&self, _buf: &[u8]) -> io::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::other("device gone"))
        }

        fn flush(&self) -> io::Result<()> {
            Ok(())
        }
    }

    fn text() -> Arc<dyn Formatter> {
        Arc::new(TextFormatter::new().without_timestamp())
    }

    #[test]
    fn test_levels_at_or_above_minimum() {
        let dir = tempdir().unwrap();
        let hook = FileHook::new(
            LogFile::new(dir.path().join("app.log")),
            Level::Warn,
            text(),
            None,
        )
        .unwrap();

        let levels = Hook::levels(&hook);
        assert!(levels.contains(Level::Error));
        assert!(levels.contains(Level::Warn));
        assert!(!levels.contains(Level::Info));
        assert!(!levels.contains(Level::Trace));
        assert_eq!(hook.min_level(), Level::Warn);
    }

    #[test]
    fn test_writers_for_without_map() {
        let dir = tempdir().unwrap();
        let writers = LevelWriters::open(&LogFile::new(dir.path().join("app.log")), None).unwrap();

        for level in Level::ALL {
            let selected: Vec<_> = writers
                .writers_for(level)
                .map(|w| w.path().to_path_buf())
                .collect();
            assert_eq!(selected, vec![dir.path().join("app.log")]);
            assert!(writers.dedicated_writer(level).is_none());
        }
    }

    #[test]
    fn test_writers_for_with_map() {
        let dir = tempdir().unwrap();
        let levels = LevelFileMap::from([
            (Level::Debug, LogFile::new(dir.path().join("debug.log"))),
            (Level::Error, LogFile::new(dir.path().join("error.log"))),
        ]);
        let writers =
            LevelWriters::open(&LogFile::new(dir.path().join("app.log")), Some(&levels)).unwrap();

        let paths = |level: Level| -> Vec<PathBuf> {
            writers.writers_for(level).map(|w| w.path().to_path_buf()).collect()
        };

        assert_eq!(
            paths(Level::Debug),
            vec![dir.path().join("app.log"), dir.path().join("debug.log")]
        );
        assert_eq!(
            paths(Level::Error),
            vec![dir.path().join("app.log"), dir.path().join("error.log")]
        );
        assert_eq!(paths(Level::Info), vec![dir.path().join("app.log")]);
        assert_eq!(writers.default_writer().path(), dir.path().join("app.log"));
    }

    #[test]
    fn test_shared_file_opened_once() {
        let dir = tempdir().unwrap();
        let default = LogFile::new(dir.path().join("app.log"));
        let levels = LevelFileMap::from([
            (Level::Warn, LogFile::new(dir.path().join("problems.log"))),
            (Level::Error, LogFile::new(dir.path().join("problems.log"))),
            (Level::Info, default.clone()),
        ]);
        let hook = FileHook::new(default, Level::Trace, text(), Some(levels)).unwrap();

        // A level mapped onto the default file is written once
        hook.fire(&Entry::new(Level::Info, "once")).unwrap();
        hook.fire(&Entry::new(Level::Warn, "careful")).unwrap();
        hook.fire(&Entry::new(Level::Error, "broken")).unwrap();

        assert_eq!(read_logs(&dir.path().join("app.log")).matches("msg=once").count(), 1);
        assert_eq!(
            read_logs(&dir.path().join("problems.log")),
            "level=warn msg=careful\nlevel=error msg=broken\n"
        );

        let warn = hook.writers().dedicated_writer(Level::Warn).unwrap();
        let error = hook.writers().dedicated_writer(Level::Error).unwrap();
        assert!(Arc::ptr_eq(warn, error));
        assert!(hook.writers().dedicated_writer(Level::Info).is_none());
    }

    #[test]
    fn test_empty_map_is_default_only() {
        let dir = tempdir().unwrap();
        let writers = LevelWriters::open(
            &LogFile::new(dir.path().join("app.log")),
            Some(&LevelFileMap::new()),
        )
        .unwrap();

        assert_eq!(writers.writers_for(Level::Error).count(), 1);
    }

    #[test]
    fn test_construction_fails_fast() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let levels = LevelFileMap::from([(Level::Error, LogFile::new(blocker.join("error.log")))]);

        let result = FileHook::new(
            LogFile::new(dir.path().join("app.log")),
            Level::Info,
            text(),
            Some(levels),
        );

        match result {
            Err(Error::Configuration { path, .. }) => assert_eq!(path, blocker.join("error.log")),
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_format_error_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let formatter = Arc::new(FailingFormatter::new(
            TextFormatter::new().without_timestamp(),
            "poison",
        ));
        let hook =
            FileHook::new(LogFile::new(&path), Level::Trace, formatter.clone(), None).unwrap();

        let result = hook.fire(&Entry::new(Level::Info, "poison pill"));
        assert!(matches!(result, Err(Error::Format(_))));
        assert_eq!(read_logs(&path), "");

        hook.fire(&Entry::new(Level::Info, "healthy")).unwrap();
        assert_eq!(read_logs(&path), "level=info msg=healthy\n");
        assert_eq!(formatter.failures(), 1);
    }

    #[test]
    fn test_write_errors_aggregate_and_do_not_roll_back() {
        let dir = tempdir().unwrap();
        let debug_path = dir.path().join("debug.log");
        let healthy: Arc<dyn LogWriter> =
            Arc::new(RollingFileWriter::open(&LogFile::new(&debug_path)).unwrap());
        let broken_default = BrokenWriter::new("/broken/app.log");
        let broken_error = BrokenWriter::new("/broken/error.log");

        let writers = LevelWriters::new(
            broken_default.clone(),
            Some(HashMap::from([
                (Level::Debug, healthy),
                (Level::Error, broken_error.clone() as Arc<dyn LogWriter>),
            ])),
        );
        let hook = FileHook::with_writers(writers, Level::Trace, text());

        let Err(Error::Write(errors)) = hook.fire(&Entry::new(Level::Debug, "partial")) else {
            panic!("expected a write error");
        };
        assert_eq!(errors.failures().len(), 1);
        assert_eq!(errors.failures()[0].path, PathBuf::from("/broken/app.log"));
        assert_eq!(read_logs(&debug_path), "level=debug msg=partial\n");

        let Err(Error::Write(errors)) = hook.fire(&Entry::new(Level::Error, "total")) else {
            panic!("expected a write error");
        };
        let paths: Vec<_> = errors.failures().iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/broken/app.log"), PathBuf::from("/broken/error.log")]
        );
        assert_eq!(broken_default.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(broken_error.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_trait_boxes_errors() {
        let hook = FileHook::with_writers(
            LevelWriters::new(BrokenWriter::new("/broken/app.log"), None),
            Level::Info,
            text(),
        );

        let error = Hook::fire(&hook, &Entry::new(Level::Info, "lost")).unwrap_err();
        assert!(error.to_string().contains("/broken/app.log: device gone"));
        assert!(Hook::flush(&hook).is_ok());
    }

    #[test]
    fn test_spellings_of_one_file_share_a_writer() {
        let dir = tempdir().unwrap();
        let default = LogFile::new(dir.path().join("app.log"));
        let levels = LevelFileMap::from([
            (Level::Error, LogFile::new(dir.path().join(".").join("app.log"))),
            (Level::Warn, LogFile::new(dir.path().join("sub/../app.log"))),
        ]);
        let hook = FileHook::new(default, Level::Trace, text(), Some(levels)).unwrap();

        assert!(hook.writers().dedicated_writer(Level::Error).is_none());
        assert!(hook.writers().dedicated_writer(Level::Warn).is_none());

        hook.fire(&Entry::new(Level::Error, "once")).unwrap();

        assert_eq!(read_logs(&dir.path().join("app.log")), "level=error msg=once\n");
    }

    #[test]
    fn test_age_sweep_keeps_level_file_sharing_the_prefix() {
        let dir = tempdir().unwrap();
        let errors = dir.path().join("app.log.error");
        fs::write(&errors, "level=error msg=yesterday\n").unwrap();
        fs::File::options()
            .write(true)
            .open(&errors)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3 * 24 * 60 * 60))
            .unwrap();

        let levels = LevelFileMap::from([(Level::Error, LogFile::new(&errors).max_age(1))]);
        let hook = FileHook::new(
            LogFile::new(dir.path().join("app.log")).max_age(1),
            Level::Trace,
            text(),
            Some(levels),
        )
        .unwrap();
        hook.fire(&Entry::new(Level::Error, "today")).unwrap();

        assert_eq!(
            read_logs(&errors),
            "level=error msg=yesterday\nlevel=error msg=today\n"
        );
    }

    #[test]
    fn test_level_file_named_like_a_backup_is_rejected() {
        let dir = tempdir().unwrap();
        let levels = LevelFileMap::from([(Level::Error, LogFile::new(dir.path().join("app.log.1")))]);

        let result = FileHook::new(
            LogFile::new(dir.path().join("app.log")),
            Level::Info,
            text(),
            Some(levels),
        );

        match result {
            Err(Error::Configuration { path, reason }) => {
                assert_eq!(path, dir.path().join("app.log.1"));
                assert!(reason.contains("rotated backups"), "{reason}");
            }
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }
}
