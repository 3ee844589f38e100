//! Log Capture Utilities for Testing
//!
//! Records tracing events (message plus structured fields) so tests can
//! assert on what the pipeline logged.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

/// Captured log record
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
}

/// Log capture layer for testing
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured log records
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    /// Check if any log message contains `pattern`
    pub fn contains(&self, pattern: &str) -> bool {
        self.records().iter().any(|r| r.message.contains(pattern))
    }

    /// Records at `level` whose message contains `pattern`
    pub fn matching_at(&self, level: Level, pattern: &str) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level && r.message.contains(pattern))
            .collect()
    }

    /// Assert at least one log matches pattern
    pub fn assert_contains(&self, pattern: &str) {
        assert!(
            self.contains(pattern),
            "Expected log matching '{}', but none found. All logs:\n{}",
            pattern,
            self.records()
                .iter()
                .map(|r| r.message.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    /// Assert no logs match pattern
    pub fn assert_no_match(&self, pattern: &str) {
        let matches: Vec<String> = self
            .records()
            .into_iter()
            .filter(|r| r.message.contains(pattern))
            .map(|r| r.message)
            .collect();
        assert!(
            matches.is_empty(),
            "Expected no logs matching '{}', but found {} matches:\n{}",
            pattern,
            matches.len(),
            matches.join("\n")
        );
    }
}

impl<S> tracing_subscriber::Layer<S> for LogCapture
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        use tracing::field::Visit;

        #[derive(Default)]
        struct FieldVisitor {
            message: String,
            fields: HashMap<String, String>,
        }

        impl Visit for FieldVisitor {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = value.to_string();
                } else {
                    self.fields.insert(field.name().to_string(), value.to_string());
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let mut text = format!("{:?}", value);
                // Remove surrounding quotes
                if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
                    text = text[1..text.len() - 1].to_string();
                }
                if field.name() == "message" {
                    self.message = text;
                } else {
                    self.fields.insert(field.name().to_string(), text);
                }
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.records.lock().unwrap().push(LogRecord {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Capture logs on the current thread until the guard drops
///
/// Works with `#[tokio::test]` (single-threaded runtime), where every task
/// runs on the test thread.
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::new();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("classview_ai=debug"))
        .with(capture.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
