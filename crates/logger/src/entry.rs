//! Log entry type handed to hooks

use crate::Level;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// One log event.
///
/// Fields are kept sorted by key so formatters render them deterministically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// Log level
    pub level: Level,
    /// The log message
    pub message: String,
    /// Structured key/value data attached to the event
    pub fields: BTreeMap<String, Value>,
    /// When the entry was created
    pub timestamp: DateTime<Utc>,
    /// Target module, empty unless set
    pub target: Cow<'static, str>,
    /// File location
    pub file: Option<String>,
    /// Line number
    pub line: Option<u32>,
}

impl Entry {
    /// Create a new entry stamped with the current time
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: BTreeMap::new(),
            timestamp: Utc::now(),
            target: Cow::Borrowed(""),
            file: None,
            line: None,
        }
    }

    /// Builder-style method for attaching a field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Builder-style method for setting target
    #[must_use]
    pub fn with_target(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        self.target = target.into();
        self
    }

    /// Builder-style method for setting location
    #[must_use]
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Builder-style method for overriding the timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
