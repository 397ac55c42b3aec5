//! Hooks and the logger that fires them

use crate::{Entry, Level, LevelSet, Logger};
use std::io::Write;
use std::sync::Arc;

/// Error type crossing the [`Hook`] boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Receives every entry whose level is in [`Hook::levels`].
///
/// Hooks may be fired concurrently from many threads.
pub trait Hook: Send + Sync + 'static {
    /// Levels this hook wants to be fired for
    fn levels(&self) -> LevelSet;

    /// Handle one entry
    ///
    /// # Errors
    ///
    /// Returns the hook's failure; the logger reports it and moves on.
    fn fire(&self, entry: &Entry) -> Result<(), BoxError>;

    /// Flush anything the hook buffers
    ///
    /// # Errors
    ///
    /// Returns the hook's failure.
    fn flush(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Logger that hands entries to registered hooks.
///
/// Entries below the logger's level are dropped before any hook sees them.
/// A failing hook never stops the remaining hooks; [`Logger::log`] reports
/// failures on stderr.
#[derive(Clone)]
pub struct HookLogger {
    level: Level,
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookLogger {
    /// Create a logger with no hooks
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self {
            level,
            hooks: Vec::new(),
        }
    }

    /// Builder-style method for registering a hook
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.add_hook(hook);
        self
    }

    /// Register a hook
    pub fn add_hook(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// Change the logger level
    pub const fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    /// Current logger level
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Number of registered hooks
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Fire every hook interested in `entry.level`, collecting failures
    ///
    /// Unlike [`Logger::log`], this does not apply the logger level.
    pub fn fire_hooks(&self, entry: &Entry) -> Vec<BoxError> {
        self.hooks
            .iter()
            .filter(|hook| hook.levels().contains(entry.level))
            .filter_map(|hook| hook.fire(entry).err())
            .collect()
    }
}

impl Logger for HookLogger {
    fn log(&self, entry: Entry) {
        if !self.is_enabled(entry.level) {
            return;
        }

        let errors = self.fire_hooks(&entry);
        if errors.is_empty() {
            return;
        }

        let mut stderr = std::io::stderr().lock();
        for error in errors {
            let _ = writeln!(stderr, "Failed to fire hook: {error}");
        }
    }

    fn flush(&self) {
        for hook in &self.hooks {
            if let Err(error) = hook.flush() {
                let _ = writeln!(std::io::stderr(), "Failed to flush hook: {error}");
            }
        }
    }

    #[inline]
    fn is_enabled(&self, level: Level) -> bool {
        level >= self.level
    }
}
