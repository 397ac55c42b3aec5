//! Core logger trait

use crate::{Entry, Level};

/// Core logger trait
pub trait Logger: Send + Sync + 'static {
    /// Log an entry
    fn log(&self, entry: Entry);

    /// Flush any buffered logs
    fn flush(&self);

    /// Check if a level is enabled (for fast filtering)
    fn is_enabled(&self, level: Level) -> bool;
}

/// Extension trait for convenient logging methods
pub trait LoggerExt: Logger {
    /// Log an error
    #[inline]
    fn error(&self, msg: impl Into<String>) {
        self.log_message(Level::Error, msg);
    }

    /// Log a warning
    #[inline]
    fn warn(&self, msg: impl Into<String>) {
        self.log_message(Level::Warn, msg);
    }

    /// Log info
    #[inline]
    fn info(&self, msg: impl Into<String>) {
        self.log_message(Level::Info, msg);
    }

    /// Log debug
    #[inline]
    fn debug(&self, msg: impl Into<String>) {
        self.log_message(Level::Debug, msg);
    }

    /// Log trace
    #[inline]
    fn trace(&self, msg: impl Into<String>) {
        self.log_message(Level::Trace, msg);
    }

    /// Log a plain message at `level`, skipping the allocation when disabled
    #[inline]
    fn log_message(&self, level: Level, msg: impl Into<String>) {
        if self.is_enabled(level) {
            self.log(Entry::new(level, msg));
        }
    }
}

// Implement for all loggers
impl<T: Logger + ?Sized> LoggerExt for T {}
