//! Metrics interceptor.

use crate::core::PaymentRequest;
use crate::errors::ProcessingResult;
use crate::processors::PaymentProcessor;
use crate::utils::duration_ms;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    total: u64,
    successful: u64,
    failed: u64,
    total_duration: Duration,
}

/// Accumulates outcome counts and durations for one pipeline.
///
/// All counters sit behind one lock so a snapshot never observes a
/// half-applied update. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    counters: Mutex<Counters>,
}

impl MetricsRecorder {
    /// Creates a recorder with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed invocation.
    pub fn record(&self, success: bool, elapsed: Duration) {
        let mut counters = self.counters.lock();
        counters.total += 1;
        if success {
            counters.successful += 1;
        } else {
            counters.failed += 1;
        }
        counters.total_duration += elapsed;
    }

    /// Returns a point-in-time view of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = *self.counters.lock();
        MetricsSnapshot::from_counters(&counters)
    }
}

/// A read-only view of a [`MetricsRecorder`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Invocations that reached the metrics layer.
    pub total_requests: u64,
    /// Invocations that returned a successful response.
    pub successful: u64,
    /// Invocations that returned a failed response or an error.
    pub failed: u64,
    /// `successful / total_requests`, or 0 with no requests.
    pub success_rate: f64,
    /// Sum of all invocation durations.
    pub total_duration_ms: f64,
    /// `total_duration_ms / total_requests`, or 0 with no requests.
    pub average_duration_ms: f64,
}

impl MetricsSnapshot {
    #[allow(clippy::cast_precision_loss)]
    fn from_counters(counters: &Counters) -> Self {
        let total_duration_ms = duration_ms(counters.total_duration);
        let (success_rate, average_duration_ms) = if counters.total == 0 {
            (0.0, 0.0)
        } else {
            let total = counters.total as f64;
            (counters.successful as f64 / total, total_duration_ms / total)
        };

        Self {
            total_requests: counters.total,
            successful: counters.successful,
            failed: counters.failed,
            success_rate,
            total_duration_ms,
            average_duration_ms,
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests={} ok={} failed={} success_rate={:.2}% avg={:.2}ms total={:.2}ms",
            self.total_requests,
            self.successful,
            self.failed,
            self.success_rate * 100.0,
            self.average_duration_ms,
            self.total_duration_ms,
        )
    }
}

/// Interceptor that times and counts every invocation reaching it.
pub struct MetricsInterceptor {
    inner: Box<dyn PaymentProcessor>,
    recorder: Arc<MetricsRecorder>,
}

impl MetricsInterceptor {
    /// Creates a new metrics interceptor feeding `recorder`.
    pub fn new<P>(inner: P, recorder: Arc<MetricsRecorder>) -> Self
    where
        P: PaymentProcessor + 'static,
    {
        Self {
            inner: Box::new(inner),
            recorder,
        }
    }

    /// Returns the recorder this interceptor feeds.
    #[must_use]
    pub fn recorder(&self) -> &Arc<MetricsRecorder> {
        &self.recorder
    }
}

#[async_trait]
impl PaymentProcessor for MetricsInterceptor {
    fn name(&self) -> &str {
        "metrics"
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        let started = Instant::now();
        let result = self.inner.process(request).await;
        let success = matches!(&result, Ok(response) if response.success);
        self.recorder.record(success, started.elapsed());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PaymentResponse;
    use crate::errors::ProcessingError;
    use crate::testing::{request_fixture, RecordingProcessor};
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_snapshot_defaults_to_zero() {
        let snapshot = MetricsRecorder::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert!(snapshot.success_rate.abs() < f64::EPSILON);
        assert!(snapshot.average_duration_ms.abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_accumulates() {
        let recorder = MetricsRecorder::new();
        recorder.record(true, Duration::from_millis(10));
        recorder.record(true, Duration::from_millis(20));
        recorder.record(false, Duration::from_millis(30));

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.successful, 2);
        assert_eq!(snapshot.failed, 1);
        assert!((snapshot.total_duration_ms - 60.0).abs() < 1e-9);
        assert!((snapshot.average_duration_ms - 20.0).abs() < 1e-9);
        assert!((snapshot.success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_display() {
        let recorder = MetricsRecorder::new();
        recorder.record(true, Duration::from_millis(10));
        let line = recorder.snapshot().to_string();
        assert!(line.contains("requests=1"));
        assert!(line.contains("success_rate=100.00%"));
    }

    #[tokio::test]
    async fn test_counts_every_outcome() {
        let inner = Arc::new(RecordingProcessor::scripted(vec![
            Ok(PaymentResponse::success("txn_1", dec!(1))),
            Ok(PaymentResponse::failure(dec!(1), "Payment failed after 3 attempts: timeout")),
            Err(ProcessingError::permanent("card blocked")),
        ]));
        let recorder = Arc::new(MetricsRecorder::new());
        let metrics = MetricsInterceptor::new(Arc::clone(&inner), Arc::clone(&recorder));
        let request = request_fixture("A");

        assert!(metrics.process(&request).await.unwrap().success);
        assert!(!metrics.process(&request).await.unwrap().success);
        assert_eq!(
            metrics.process(&request).await.unwrap_err(),
            ProcessingError::permanent("card blocked")
        );

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.successful, 1);
        assert_eq!(snapshot.failed, 2);
    }

    #[tokio::test]
    async fn test_measures_duration() {
        let inner = RecordingProcessor::succeeding().with_latency(Duration::from_millis(20));
        let recorder = Arc::new(MetricsRecorder::new());
        let metrics = MetricsInterceptor::new(inner, Arc::clone(&recorder));

        metrics.process(&request_fixture("A")).await.unwrap();

        assert!(recorder.snapshot().total_duration_ms >= 20.0);
    }
}
