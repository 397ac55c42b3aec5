//! Level-routed rotating file logging
//!
//! [`FileHook`] is a [`proven_logger::Hook`] that appends every entry it is
//! fired with to a default rotating file, and additionally to a dedicated
//! file when one is configured for the entry's exact level:
//!
//! - Rotation, backup retention and compression are handled by `logroller`
//! - Each destination file is opened once and shared by every level naming it
//! - Appends to one file are serialized; distinct files never block each other
//! - Write failures are aggregated across destinations and never retried

#![warn(missing_docs, unreachable_pub)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod hook;
mod writer;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{FileHookConfig, FormatKind, LevelFileMap, LogFile};
pub use error::{Error, Result, WriteErrors, WriteFailure};
pub use hook::{FileHook, LevelWriters};
pub use writer::{LogWriter, RollingFileWriter};
