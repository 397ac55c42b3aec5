//! Rendering entries into bytes

use crate::Entry;
use chrono::SecondsFormat;
use serde_json::{Map, Value};
use std::fmt::Write as FmtWrite;

/// Errors a formatter can return.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// JSON serialization failed
    #[error("failed to serialize entry: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other formatter failure
    #[error("failed to format entry: {0}")]
    Message(String),
}

/// Converts an entry into the bytes a hook writes out.
pub trait Formatter: Send + Sync + 'static {
    /// Render one entry, including its trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be rendered.
    fn format(&self, entry: &Entry) -> Result<Vec<u8>, FormatError>;
}

const TIME_KEY: &str = "time";
const LEVEL_KEY: &str = "level";
const MESSAGE_KEY: &str = "msg";
const FILE_KEY: &str = "file";

/// `key=value` line format.
///
/// ```text
/// time="2024-05-01T10:00:00Z" level=info msg="request served" status=200
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    disable_timestamp: bool,
    timestamp_format: Option<String>,
}

impl TextFormatter {
    /// Create a formatter emitting RFC 3339 timestamps
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave the `time` key out
    #[must_use]
    pub const fn without_timestamp(mut self) -> Self {
        self.disable_timestamp = true;
        self
    }

    /// Render timestamps with a `strftime`-style pattern instead of RFC 3339
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = Some(format.into());
        self
    }
}

impl Formatter for TextFormatter {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>, FormatError> {
        let mut line = String::with_capacity(128);

        if !self.disable_timestamp {
            let time = match &self.timestamp_format {
                Some(pattern) => {
                    let mut time = String::new();
                    write!(time, "{}", entry.timestamp.format(pattern)).map_err(|_| {
                        FormatError::Message(format!("invalid timestamp format {pattern:?}"))
                    })?;
                    time
                }
                None => entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            };
            append_pair(&mut line, TIME_KEY, &time);
        }

        append_pair(&mut line, LEVEL_KEY, entry.level.as_str());
        append_pair(&mut line, MESSAGE_KEY, &entry.message);

        if let (Some(file), Some(number)) = (&entry.file, entry.line) {
            append_pair(&mut line, FILE_KEY, &format!("{file}:{number}"));
        }

        for (key, value) in &entry.fields {
            match value {
                Value::String(text) => append_pair(&mut line, key, text),
                other => append_pair(&mut line, key, &other.to_string()),
            }
        }

        line.push('\n');
        Ok(line.into_bytes())
    }
}

fn append_pair(line: &mut String, key: &str, value: &str) {
    if !line.is_empty() {
        line.push(' ');
    }
    line.push_str(key);
    line.push('=');
    if needs_quoting(value) {
        let _ = write!(line, "{value:?}");
    } else {
        line.push_str(value);
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || !value.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/' | '@' | '^' | '+')
        })
}

/// One JSON object per line.
///
/// User fields named like one of the reserved keys (`time`, `level`, `msg`,
/// `file`) are renamed to `fields.<key>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter {
    disable_timestamp: bool,
}

impl JsonFormatter {
    /// Create a JSON formatter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            disable_timestamp: false,
        }
    }

    /// Leave the `time` key out
    #[must_use]
    pub const fn without_timestamp(mut self) -> Self {
        self.disable_timestamp = true;
        self
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>, FormatError> {
        let mut object = Map::with_capacity(entry.fields.len() + 4);

        for (key, value) in &entry.fields {
            let key = match key.as_str() {
                TIME_KEY | LEVEL_KEY | MESSAGE_KEY | FILE_KEY => format!("fields.{key}"),
                _ => key.clone(),
            };
            object.insert(key, value.clone());
        }

        if !self.disable_timestamp {
            object.insert(
                TIME_KEY.to_string(),
                Value::String(entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        object.insert(LEVEL_KEY.to_string(), Value::from(entry.level.as_str()));
        object.insert(MESSAGE_KEY.to_string(), Value::from(entry.message.as_str()));
        if let (Some(file), Some(number)) = (&entry.file, entry.line) {
            object.insert(FILE_KEY.to_string(), Value::String(format!("{file}:{number}")));
        }

        let mut bytes = serde_json::to_vec(&object)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
