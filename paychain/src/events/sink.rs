//! Sinks receiving the events interceptors emit.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::Level;

/// Destination for pipeline events.
///
/// `payload` is a JSON object whose `stage` field names the emitting layer.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers an event, possibly waiting on the sink.
    async fn emit(&self, name: &str, payload: Option<Value>);
}

/// Sink that drops every event.
///
/// Standalone interceptors start with this sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _name: &str, _payload: Option<Value>) {}
}

/// Sink that turns events into `tracing` records at a fixed level.
///
/// The record carries the event name, the emitting stage and the
/// idempotency key as separate fields, plus the full payload as JSON.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl LoggingEventSink {
    /// Logs at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Returns the level records are written at.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    fn record(&self, name: &str, payload: Option<&Value>) {
        let field = |key: &str| {
            payload
                .and_then(|p| p.get(key))
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string()
        };
        let stage = field("stage");
        let key = field("idempotency_key");
        let payload = payload.map(Value::to_string).unwrap_or_default();

        macro_rules! record_at {
            ($level:expr) => {
                tracing::event!(
                    $level,
                    event = name,
                    stage = %stage,
                    idempotency_key = %key,
                    payload = %payload,
                    "{name}"
                )
            };
        }

        if self.level == Level::TRACE {
            record_at!(Level::TRACE);
        } else if self.level == Level::DEBUG {
            record_at!(Level::DEBUG);
        } else if self.level == Level::INFO {
            record_at!(Level::INFO);
        } else if self.level == Level::WARN {
            record_at!(Level::WARN);
        } else {
            record_at!(Level::ERROR);
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, name: &str, payload: Option<Value>) {
        self.record(name, payload.as_ref());
    }
}

/// One event captured by a [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event name, e.g. `payment.started`.
    pub name: String,
    /// Payload as emitted.
    pub payload: Option<Value>,
}

impl RecordedEvent {
    /// Looks up a top-level payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.as_ref().and_then(|p| p.get(key))
    }
}

/// Sink that keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    recorded: Mutex<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, name: &str, payload: Option<Value>) {
        self.recorded.lock().push(RecordedEvent {
            name: name.to_string(),
            payload,
        });
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.recorded.lock().clone()
    }

    /// Returns the recorded event names, in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.recorded.lock().iter().map(|e| e.name.clone()).collect()
    }

    /// Returns the recorded events called exactly `name`.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<RecordedEvent> {
        self.recorded
            .lock()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorded.lock().len()
    }

    /// True until the first event arrives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recorded.lock().is_empty()
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.recorded.lock().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, name: &str, payload: Option<Value>) {
        self.push(name, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_sink_accepts_anything() {
        NoOpEventSink.emit("payment.started", None).await;
        NoOpEventSink
            .emit("payment.completed", Some(json!({ "stage": "logging" })))
            .await;
    }

    #[tokio::test]
    async fn test_logging_sink_handles_missing_fields() {
        let sink = LoggingEventSink::debug();
        assert_eq!(sink.level(), Level::DEBUG);

        sink.emit("payment.started", Some(json!({ "stage": "logging", "amount": "1.00" })))
            .await;
        sink.emit("payment.completed", None).await;
        sink.emit("payment.failed", Some(json!("not an object"))).await;
    }

    #[tokio::test]
    async fn test_collecting_sink_keeps_order() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("payment.started", Some(json!({ "stage": "logging" }))).await;
        sink.emit("payment.completed", Some(json!({ "success": true }))).await;

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.event_types(),
            vec!["payment.started".to_string(), "payment.completed".to_string()]
        );
        assert_eq!(sink.events()[1].field("success"), Some(&json!(true)));
        assert_eq!(sink.events()[0].field("missing"), None);
    }

    #[tokio::test]
    async fn test_events_named_matches_exactly() {
        let sink = CollectingEventSink::new();
        sink.emit("payment.retry_scheduled", None).await;
        sink.emit("payment.retries_exhausted", None).await;
        sink.emit("payment.retry_scheduled", None).await;

        assert_eq!(sink.events_named("payment.retry_scheduled").len(), 2);
        assert!(sink.events_named("payment.retry").is_empty());

        sink.clear();
        assert!(sink.is_empty());
    }
}
