//! In-memory capture of tracing events for the admin log endpoints.
//!
//! `LogCaptureLayer` copies every event into a bounded `LogBuffer`, which
//! keeps the most recent entries and broadcasts new ones to SSE clients.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const BROADCAST_CAPACITY: usize = 1024;

/// A captured tracing event
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
    /// Structured fields other than the message, as `key=value`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl LogEntry {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Whether this entry is at least as severe as `min`
    pub fn at_least(&self, min: Level) -> bool {
        self.level
            .parse::<Level>()
            // Level orders TRACE as the greatest, so severity is the reverse
            .map(|level| level <= min)
            .unwrap_or(true)
    }
}

/// Ring of recent entries plus a broadcast channel for live ones
pub struct LogBuffer {
    tx: broadcast::Sender<LogEntry>,
    recent: parking_lot::RwLock<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            recent: parking_lot::RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        {
            let mut recent = self.recent.write();
            if recent.len() >= self.capacity {
                recent.pop_front();
            }
            recent.push_back(entry.clone());
        }

        // No receivers is fine
        let _ = self.tx.send(entry);
    }

    /// Up to `count` most recent entries, oldest first, optionally filtered by level
    pub fn recent(&self, count: usize, min_level: Option<Level>) -> Vec<LogEntry> {
        let recent = self.recent.read();
        let mut entries: Vec<LogEntry> = recent
            .iter()
            .rev()
            .filter(|e| min_level.map_or(true, |min| e.at_least(min)))
            .take(count)
            .cloned()
            .collect();
        entries.reverse();
        entries
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }
}

pub type SharedLogBuffer = Arc<LogBuffer>;

pub fn create_log_buffer(capacity: usize) -> SharedLogBuffer {
    Arc::new(LogBuffer::new(capacity))
}

/// Tracing layer that copies events into a `LogBuffer`
pub struct LogCaptureLayer {
    buffer: SharedLogBuffer,
}

impl LogCaptureLayer {
    pub fn new(buffer: SharedLogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<String>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn entry(level: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: chrono::Utc::now(),
            level: level.to_string(),
            target: "walk_server".to_string(),
            message: message.to_string(),
            fields: Vec::new(),
        }
    }

    #[test]
    fn test_ring_keeps_latest() {
        let buffer = create_log_buffer(2);
        for i in 1..=5 {
            buffer.push(entry("INFO", &format!("Check-in {}", i)));
        }

        let recent = buffer.recent(10, None);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "Check-in 4");
        assert_eq!(recent[1].message, "Check-in 5");
    }

    #[test]
    fn test_recent_filters_by_level() {
        let buffer = create_log_buffer(10);
        buffer.push(entry("DEBUG", "noise"));
        buffer.push(entry("WARN", "wrong secret"));
        buffer.push(entry("INFO", "team 3 at point 1"));
        buffer.push(entry("ERROR", "save failed"));

        let warnings = buffer.recent(10, Some(Level::WARN));
        let messages: Vec<&str> = warnings.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["wrong secret", "save failed"]);

        let last_info = buffer.recent(1, Some(Level::INFO));
        assert_eq!(last_info[0].message, "save failed");
    }

    #[tokio::test]
    async fn test_layer_captures_fields_and_broadcasts() {
        let buffer = create_log_buffer(10);
        let mut rx = buffer.subscribe();
        let subscriber =
            tracing_subscriber::registry().with(LogCaptureLayer::new(buffer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(team_id = 7, "Team checked in");
        });

        let recent = buffer.recent(10, None);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "Team checked in");
        assert_eq!(recent[0].fields, vec!["team_id=7".to_string()]);
        assert_eq!(recent[0].level, "INFO");

        let live = rx.recv().await.unwrap();
        assert_eq!(live.message, "Team checked in");
        assert!(live.to_json().contains("\"team_id=7\""));
    }
}
