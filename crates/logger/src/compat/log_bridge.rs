//! Bridge from the `log` crate to proven-logger

use crate::{Entry, Level, Logger};
use log::{Log, Metadata, Record as LogRecord};
use std::sync::Arc;

/// Wrapper to implement the log crate's Log trait
pub struct LogBridge {
    logger: Arc<dyn Logger>,
}

impl LogBridge {
    /// Create a new log bridge
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.logger.is_enabled(map_level(metadata.level()))
    }

    fn log(&self, record: &LogRecord) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut entry = Entry::new(map_level(record.level()), record.args().to_string())
            .with_target(record.target().to_string());

        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            entry = entry.with_location(file, line);
        }

        self.logger.log(entry);
    }

    fn flush(&self) {
        self.logger.flush();
    }
}

/// Map log levels to our levels
const fn map_level(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug => Level::Debug,
        log::Level::Trace => Level::Trace,
    }
}

/// Initialize the log crate to use proven-logger
///
/// This will capture all logs from crates using the `log` crate macros.
/// Level filtering is left to `logger`.
///
/// # Errors
///
/// Returns an error if a `log` logger is already installed.
pub fn init_log_bridge(logger: Arc<dyn Logger>) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(logger)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CaptureHook;
    use crate::{HookLogger, LevelSet};

    #[test]
    fn test_records_become_entries() {
        let hook = CaptureHook::new(LevelSet::all());
        let bridge = LogBridge::new(Arc::new(
            HookLogger::new(Level::Info).with_hook(Arc::new(hook.clone())),
        ));

        bridge.log(
            &LogRecord::builder()
                .level(log::Level::Warn)
                .target("app::db")
                .args(format_args!("pool exhausted after {} tries", 3))
                .file(Some("src/db.rs"))
                .line(Some(12))
                .build(),
        );
        bridge.log(
            &LogRecord::builder()
                .level(log::Level::Debug)
                .args(format_args!("hidden"))
                .build(),
        );

        let entries = hook.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::Warn);
        assert_eq!(entries[0].message, "pool exhausted after 3 tries");
        assert_eq!(entries[0].target, "app::db");
        assert_eq!(entries[0].file.as_deref(), Some("src/db.rs"));
        assert_eq!(entries[0].line, Some(12));
    }
}
