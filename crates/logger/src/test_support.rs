//! Test support utilities
//!
//! This module provides hooks and formatters for exercising logging code in
//! tests. It's only available when the `test-support` feature is enabled.

use crate::{BoxError, Entry, FormatError, Formatter, Hook, LevelSet};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A hook that records every entry it is fired with
#[derive(Clone)]
pub struct CaptureHook {
    levels: LevelSet,
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl CaptureHook {
    /// Create a capture hook interested in `levels`
    #[must_use]
    pub fn new(levels: LevelSet) -> Self {
        Self {
            levels,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// All captured entries, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().clone()
    }

    /// Messages of all captured entries, oldest first
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|entry| entry.message.clone()).collect()
    }

    /// Check if any captured message contains `text`
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.entries.lock().iter().any(|entry| entry.message.contains(text))
    }

    /// Clear captured entries
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Hook for CaptureHook {
    fn levels(&self) -> LevelSet {
        self.levels
    }

    fn fire(&self, entry: &Entry) -> Result<(), BoxError> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}

/// Formatter that rejects entries whose message contains a marker
///
/// Everything else is rendered by the wrapped formatter.
pub struct FailingFormatter<F> {
    inner: F,
    marker: String,
    failures: AtomicUsize,
}

impl<F: Formatter> FailingFormatter<F> {
    /// Fail on messages containing `marker`, delegate the rest to `inner`
    pub fn new(inner: F, marker: impl Into<String>) -> Self {
        Self {
            inner,
            marker: marker.into(),
            failures: AtomicUsize::new(0),
        }
    }

    /// How many entries were rejected so far
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

impl<F: Formatter> Formatter for FailingFormatter<F> {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>, FormatError> {
        if entry.message.contains(&self.marker) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(FormatError::Message(format!(
                "refusing to format {:?}",
                entry.message
            )));
        }
        self.inner.format(entry)
    }
}
