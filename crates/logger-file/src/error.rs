//! Error types for file-based logging

use proven_logger::FormatError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type for file logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during file logging
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A destination file could not be opened; the hook was not built
    #[error("Failed to open log file {path}: {reason}")]
    Configuration {
        /// The file that could not be opened
        path: PathBuf,
        /// Why it could not be opened
        reason: String,
    },

    /// The formatter rejected the entry; nothing was written
    #[error(transparent)]
    Format(#[from] FormatError),

    /// One or more destinations failed to append the entry
    #[error(transparent)]
    Write(#[from] WriteErrors),
}

/// A single destination that failed to append an entry
#[derive(Debug)]
pub struct WriteFailure {
    /// The destination file
    pub path: PathBuf,
    /// The underlying error
    pub source: io::Error,
}

/// Every destination that failed during one fire, in the order they were
/// attempted (default file first).
#[derive(Debug)]
pub struct WriteErrors(Vec<WriteFailure>);

impl WriteErrors {
    pub(crate) const fn new(failures: Vec<WriteFailure>) -> Self {
        Self(failures)
    }

    /// The individual failures
    #[must_use]
    pub fn failures(&self) -> &[WriteFailure] {
        &self.0
    }
}

impl fmt::Display for WriteErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to write log entry to {} file(s)", self.0.len())?;
        for (i, failure) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", failure.path.display(), failure.source)?;
        }
        Ok(())
    }
}

impl std::error::Error for WriteErrors {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0
            .first()
            .map(|failure| &failure.source as &(dyn std::error::Error + 'static))
    }
}
