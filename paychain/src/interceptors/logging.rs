//! Logging interceptor.
//!
//! Emits a start event before delegating and a completion or failure event
//! afterwards. Outcomes pass through unchanged. The events are the
//! user-facing record; the layer's own `tracing` output stays at debug level.

use crate::core::PaymentRequest;
use crate::errors::ProcessingResult;
use crate::events::{self, EventSink, LoggingEventSink};
use crate::processors::PaymentProcessor;
use crate::utils::{duration_ms, iso_timestamp};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Interceptor that records the start, end and failures of every call.
pub struct LoggingInterceptor {
    inner: Box<dyn PaymentProcessor>,
    sink: Arc<dyn EventSink>,
}

impl LoggingInterceptor {
    /// Creates a logging interceptor that writes events to `tracing`.
    pub fn new<P>(inner: P) -> Self
    where
        P: PaymentProcessor + 'static,
    {
        Self {
            inner: Box::new(inner),
            sink: Arc::new(LoggingEventSink::default()),
        }
    }

    /// Sets the sink that receives events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }
}

#[async_trait]
impl PaymentProcessor for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        let masked_card = request.masked_card_number();
        debug!(
            stage = self.name(),
            idempotency_key = %request.idempotency_key,
            amount = %request.amount,
            card = %masked_card,
            "Processing payment"
        );
        self.sink
            .emit(
                events::PAYMENT_STARTED,
                Some(serde_json::json!({
                    "stage": self.name(),
                    "idempotency_key": request.idempotency_key,
                    "amount": request.amount.to_string(),
                    "card": masked_card,
                    "timestamp": iso_timestamp(),
                })),
            )
            .await;

        let started = Instant::now();
        let result = self.inner.process(request).await;
        let elapsed_ms = duration_ms(started.elapsed());

        match &result {
            Ok(response) => {
                debug!(
                    stage = self.name(),
                    idempotency_key = %request.idempotency_key,
                    success = response.success,
                    outcome = %response.message,
                    duration_ms = elapsed_ms,
                    "Payment completed"
                );
                self.sink
                    .emit(
                        events::PAYMENT_COMPLETED,
                        Some(serde_json::json!({
                            "stage": self.name(),
                            "idempotency_key": request.idempotency_key,
                            "success": response.success,
                            "message": response.message,
                            "transaction_id": response.transaction_id,
                            "duration_ms": elapsed_ms,
                        })),
                    )
                    .await;
            }
            Err(err) => {
                debug!(
                    stage = self.name(),
                    idempotency_key = %request.idempotency_key,
                    kind = %err.kind(),
                    error = %err,
                    duration_ms = elapsed_ms,
                    "Payment failed"
                );
                self.sink
                    .emit(
                        events::PAYMENT_FAILED,
                        Some(serde_json::json!({
                            "stage": self.name(),
                            "idempotency_key": request.idempotency_key,
                            "kind": err.kind(),
                            "error": err.description(),
                            "duration_ms": elapsed_ms,
                        })),
                    )
                    .await;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PaymentResponse;
    use crate::errors::ProcessingError;
    use crate::events::CollectingEventSink;
    use crate::testing::{request_fixture, RecordingProcessor};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn logging(inner: RecordingProcessor) -> (LoggingInterceptor, Arc<CollectingEventSink>) {
        let sink = Arc::new(CollectingEventSink::new());
        let interceptor = LoggingInterceptor::new(inner).with_event_sink(sink.clone());
        (interceptor, sink)
    }

    #[tokio::test]
    async fn test_success_emits_start_and_completion() {
        let (logging, sink) = logging(RecordingProcessor::succeeding());

        let response = logging.process(&request_fixture("A")).await.unwrap();
        assert!(response.success);

        assert_eq!(
            sink.event_types(),
            vec![
                events::PAYMENT_STARTED.to_string(),
                events::PAYMENT_COMPLETED.to_string(),
            ]
        );

        let events = sink.events();
        let started = &events[0];
        assert_eq!(started.field("stage"), Some(&serde_json::json!("logging")));
        assert_eq!(started.field("card"), Some(&serde_json::json!("**** **** **** 1111")));
        assert_eq!(started.field("amount"), Some(&serde_json::json!("100.00")));
        assert!(started.field("timestamp").and_then(|t| t.as_str()).is_some());

        let completed = &events[1];
        assert_eq!(completed.field("success"), Some(&serde_json::json!(true)));
        assert_eq!(
            completed.field("message"),
            Some(&serde_json::json!("Payment processed successfully"))
        );
        assert!(completed.field("duration_ms").and_then(|d| d.as_f64()).is_some());
    }

    #[tokio::test]
    async fn test_declined_response_is_recorded_as_completed() {
        let declined = "Payment failed after 3 attempts: Payment gateway temporarily unavailable";
        let (logging, sink) = logging(RecordingProcessor::scripted(vec![Ok(
            PaymentResponse::failure(dec!(100.00), declined),
        )]));

        let response = logging.process(&request_fixture("A")).await.unwrap();
        assert!(!response.success);

        assert_eq!(
            sink.event_types(),
            vec![
                events::PAYMENT_STARTED.to_string(),
                events::PAYMENT_COMPLETED.to_string(),
            ]
        );
        let completed = &sink.events_named(events::PAYMENT_COMPLETED)[0];
        assert_eq!(completed.field("success"), Some(&serde_json::json!(false)));
        assert_eq!(completed.field("message"), Some(&serde_json::json!(declined)));
        assert_eq!(completed.field("transaction_id"), Some(&serde_json::Value::Null));
    }

    #[tokio::test]
    async fn test_started_event_never_contains_full_card() {
        let (logging, sink) = logging(RecordingProcessor::succeeding());

        logging.process(&request_fixture("A")).await.unwrap();

        for event in sink.events() {
            let rendered = event.payload.map(|p| p.to_string()).unwrap_or_default();
            assert!(!rendered.contains("4111111111111111"));
        }
    }

    #[tokio::test]
    async fn test_error_is_recorded_and_propagated_unchanged() {
        let (logging, sink) = logging(RecordingProcessor::always(|| {
            Err(ProcessingError::permanent("card blocked"))
        }));

        let err = logging.process(&request_fixture("A")).await.unwrap_err();
        assert_eq!(err, ProcessingError::permanent("card blocked"));

        let failed = sink.events_named(events::PAYMENT_FAILED);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].field("kind"), Some(&serde_json::json!("permanent")));
        assert_eq!(failed[0].field("error"), Some(&serde_json::json!("card blocked")));
    }
}
