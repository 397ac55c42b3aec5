//! Bridge from tracing to proven-logger

use crate::{Entry, Level, Logger};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{Event, Subscriber, field::Field, field::Visit};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// A tracing layer that forwards events to a [`Logger`]
pub struct TracingBridge<S> {
    logger: Arc<dyn Logger>,
    _phantom: std::marker::PhantomData<fn(S)>,
}

impl<S> TracingBridge<S> {
    /// Create a new tracing bridge
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<S> Layer<S> for TracingBridge<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = map_level(*metadata.level());

        if !self.logger.is_enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        // Prefix the message with the span path, root first
        let mut span_path = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                span_path.push(span.name());
            }
        }
        let message = if span_path.is_empty() {
            visitor.message
        } else {
            format!("{}: {}", span_path.join("::"), visitor.message)
        };

        let mut entry = Entry::new(level, message).with_target(metadata.target());
        entry.fields = visitor.fields;

        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            entry = entry.with_location(file, line);
        }

        self.logger.log(entry);
    }
}

fn map_level(level: tracing::Level) -> Level {
    match level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::INFO => Level::Info,
        tracing::Level::DEBUG => Level::Debug,
        tracing::Level::TRACE => Level::Trace,
    }
}

/// Splits the `message` field from structured fields
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }
}

/// Initialize tracing to forward to proven-logger
///
/// This sets up a global subscriber that captures all tracing events.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing_bridge(logger: Arc<dyn Logger>) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::layer::SubscriberExt;

    let subscriber = tracing_subscriber::registry().with(TracingBridge::new(logger));
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CaptureHook;
    use crate::{HookLogger, LevelSet};
    use tracing_subscriber::prelude::*;

    fn capture(level: Level) -> (CaptureHook, Arc<dyn Logger>) {
        let hook = CaptureHook::new(LevelSet::all());
        let logger = HookLogger::new(level).with_hook(Arc::new(hook.clone()));
        (hook, Arc::new(logger))
    }

    #[test]
    fn test_events_become_entries() {
        let (hook, logger) = capture(Level::Debug);
        let subscriber = tracing_subscriber::registry().with(TracingBridge::new(logger));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(count = 42, user = "ada", "Message with field");
            tracing::trace!("filtered by the logger level");
        });

        let entries = hook.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::Info);
        assert_eq!(entries[0].message, "Message with field");
        assert_eq!(entries[0].fields["count"], 42);
        assert_eq!(entries[0].fields["user"], "ada");
        assert!(entries[0].line.is_some());
    }

    #[test]
    fn test_span_path_prefixes_message() {
        let (hook, logger) = capture(Level::Trace);
        let subscriber = tracing_subscriber::registry().with(TracingBridge::new(logger));

        tracing::subscriber::with_default(subscriber, || {
            let outer = tracing::info_span!("outer");
            let _outer = outer.enter();
            let inner = tracing::info_span!("inner");
            let _inner = inner.enter();

            tracing::warn!("Inside span");
        });

        assert_eq!(hook.messages(), vec!["outer::inner: Inside span".to_string()]);
    }
}
