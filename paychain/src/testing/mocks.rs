//! Mock processors for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::core::{PaymentRequest, PaymentResponse};
use crate::errors::ProcessingResult;
use crate::processors::PaymentProcessor;
use crate::utils::generate_transaction_id;

type Responder = Box<dyn Fn(&PaymentRequest) -> ProcessingResult + Send + Sync>;

/// A processor that records every request it receives and answers from a
/// script, falling back to a fixed responder once the script runs out.
pub struct RecordingProcessor {
    name: String,
    script: Mutex<VecDeque<ProcessingResult>>,
    fallback: Responder,
    latency: Duration,
    calls: Mutex<Vec<PaymentRequest>>,
}

impl RecordingProcessor {
    fn with_fallback(fallback: Responder) -> Self {
        Self {
            name: "recording".to_string(),
            script: Mutex::new(VecDeque::new()),
            fallback,
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a processor that always succeeds with a fresh transaction id.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::with_fallback(Box::new(|request: &PaymentRequest| {
            Ok(PaymentResponse::success(
                generate_transaction_id(),
                request.amount,
            ))
        }))
    }

    /// Creates a processor that answers every call with `respond()`.
    pub fn always<F>(respond: F) -> Self
    where
        F: Fn() -> ProcessingResult + Send + Sync + 'static,
    {
        Self::with_fallback(Box::new(move |_: &PaymentRequest| respond()))
    }

    /// Creates a processor that plays back `results` in order, then succeeds.
    #[must_use]
    pub fn scripted(results: Vec<ProcessingResult>) -> Self {
        let processor = Self::succeeding();
        *processor.script.lock() = results.into();
        processor
    }

    /// Sets the name reported by [`PaymentProcessor::name`].
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a simulated delay to every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the number of times the processor was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns every request received, in order.
    #[must_use]
    pub fn recorded_requests(&self) -> Vec<PaymentRequest> {
        self.calls.lock().clone()
    }

    /// Returns the idempotency keys of every request received, in order.
    #[must_use]
    pub fn recorded_keys(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|r| r.idempotency_key.clone())
            .collect()
    }
}

impl std::fmt::Debug for RecordingProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingProcessor")
            .field("name", &self.name)
            .field("call_count", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentProcessor for RecordingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        self.calls.lock().push(request.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| (self.fallback)(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProcessingError;
    use crate::testing::request_fixture;

    #[tokio::test]
    async fn test_scripted_then_fallback() {
        let processor = RecordingProcessor::scripted(vec![Err(ProcessingError::transient("t"))]);

        assert!(processor.process(&request_fixture("A")).await.is_err());
        assert!(processor.process(&request_fixture("B")).await.unwrap().success);
        assert_eq!(processor.recorded_keys(), vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_always() {
        let processor = RecordingProcessor::always(|| Err(ProcessingError::permanent("p")))
            .with_name("broken");

        assert_eq!(processor.name(), "broken");
        for _ in 0..3 {
            assert!(processor.process(&request_fixture("A")).await.is_err());
        }
        assert_eq!(processor.call_count(), 3);
    }
}
