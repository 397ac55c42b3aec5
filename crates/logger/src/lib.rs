//! Hook-based structured logging.
//!
//! Entries are produced by a [`Logger`] and handed to every registered
//! [`Hook`] whose [`LevelSet`] contains the entry's level. Hooks render
//! entries through a [`Formatter`] and ship the bytes wherever they like.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod entry;
mod formatter;
mod hook;
mod level;
mod logger;

pub mod compat;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use entry::Entry;
pub use formatter::{FormatError, Formatter, JsonFormatter, TextFormatter};
pub use hook::{BoxError, Hook, HookLogger};
pub use level::{Level, LevelSet, ParseLevelError};
pub use logger::{Logger, LoggerExt};
