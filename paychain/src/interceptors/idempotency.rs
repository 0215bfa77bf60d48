//! Idempotency interceptor.
//!
//! Successful responses are cached by idempotency key and replayed verbatim
//! on later requests bearing the same key. Failures are never cached, so a
//! caller may retry under the same key.

use crate::core::{PaymentRequest, PaymentResponse};
use crate::errors::ProcessingResult;
use crate::events::{self, EventSink, NoOpEventSink};
use crate::processors::PaymentProcessor;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Store of successful responses keyed by idempotency key.
///
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct IdempotencyStore {
    entries: DashMap<String, PaymentResponse>,
    in_flight: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl IdempotencyStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a cached response.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<PaymentResponse> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns true if a response is cached under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Caches a response. Failed responses are ignored.
    pub fn insert(&self, key: impl Into<String>, response: PaymentResponse) {
        if response.success {
            self.entries.insert(key.into(), response);
        }
    }

    /// Returns the number of cached responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    fn claim<'a>(&'a self, key: &'a str) -> KeyClaim<'a> {
        let entry = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())));
        KeyClaim {
            store: self,
            key,
            lock: Arc::clone(entry.value()),
        }
    }
}

/// A caller's interest in a key's lock.
///
/// Dropping the claim, including when the caller abandons the future
/// mid-flight, removes the lock from the store once no other caller holds it.
struct KeyClaim<'a> {
    store: &'a IdempotencyStore,
    key: &'a str,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for KeyClaim<'_> {
    fn drop(&mut self) {
        // Two references left: the map's and this claim's.
        self.store.in_flight.remove_if(self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

/// Interceptor that short-circuits requests whose key already succeeded.
///
/// Concurrent first-time requests with the same key are serialized, so at
/// most one of them reaches the inner processor while the others wait and
/// then replay its result. Requests with different keys never wait on each
/// other.
pub struct IdempotencyInterceptor {
    inner: Box<dyn PaymentProcessor>,
    store: Arc<IdempotencyStore>,
    sink: Arc<dyn EventSink>,
}

impl IdempotencyInterceptor {
    /// Creates a new idempotency interceptor backed by `store`.
    pub fn new<P>(inner: P, store: Arc<IdempotencyStore>) -> Self
    where
        P: PaymentProcessor + 'static,
    {
        Self {
            inner: Box::new(inner),
            store,
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink that receives cache-hit events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<IdempotencyStore> {
        &self.store
    }

    async fn replay(&self, key: &str) -> Option<PaymentResponse> {
        let cached = self.store.get(key)?;

        debug!(stage = self.name(), idempotency_key = %key, "Serving cached response");
        self.sink
            .emit(
                events::IDEMPOTENCY_HIT,
                Some(serde_json::json!({
                    "stage": self.name(),
                    "key": key,
                    "transaction_id": cached.transaction_id,
                })),
            )
            .await;

        Some(cached)
    }
}

#[async_trait]
impl PaymentProcessor for IdempotencyInterceptor {
    fn name(&self) -> &str {
        "idempotency"
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        let key = request.idempotency_key.as_str();

        if let Some(cached) = self.replay(key).await {
            return Ok(cached);
        }

        let claim = self.store.claim(key);
        let _guard = claim.lock.lock().await;

        // Another caller with this key may have finished while we waited.
        if let Some(cached) = self.replay(key).await {
            return Ok(cached);
        }

        let result = self.inner.process(request).await;
        if let Ok(response) = &result {
            self.store.insert(key, response.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProcessingError;
    use crate::events::CollectingEventSink;
    use crate::testing::{request_fixture, RecordingProcessor};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn interceptor(inner: &Arc<RecordingProcessor>) -> IdempotencyInterceptor {
        IdempotencyInterceptor::new(Arc::clone(inner), Arc::new(IdempotencyStore::new()))
    }

    #[test]
    fn test_store_ignores_failures() {
        let store = IdempotencyStore::new();
        assert!(store.get("k").is_none());

        store.insert("k", PaymentResponse::failure(dec!(1), "declined"));
        assert!(store.is_empty());

        store.insert("k", PaymentResponse::success("txn_1", dec!(1)));
        assert!(store.contains("k"));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let inner = Arc::new(RecordingProcessor::succeeding());
        let idempotency = interceptor(&inner);
        let request = request_fixture("A");

        let first = idempotency.process(&request).await.unwrap();
        let second = idempotency.process(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_response_is_not_cached() {
        let inner = Arc::new(RecordingProcessor::scripted(vec![Ok(
            PaymentResponse::failure(dec!(100.00), "Payment failed after 3 attempts: timeout"),
        )]));
        let idempotency = interceptor(&inner);
        let request = request_fixture("A");

        let first = idempotency.process(&request).await.unwrap();
        assert!(!first.success);

        let second = idempotency.process(&request).await.unwrap();
        assert!(second.success);
        assert_eq!(inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_error_is_propagated_and_not_cached() {
        let inner = Arc::new(RecordingProcessor::scripted(vec![Err(
            ProcessingError::permanent("card blocked"),
        )]));
        let idempotency = interceptor(&inner);
        let request = request_fixture("A");

        let err = idempotency.process(&request).await.unwrap_err();
        assert_eq!(err, ProcessingError::permanent("card blocked"));
        assert!(idempotency.store().is_empty());

        assert!(idempotency.process(&request).await.unwrap().success);
        assert_eq!(inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_different_keys_are_independent() {
        let inner = Arc::new(RecordingProcessor::succeeding());
        let idempotency = interceptor(&inner);

        let a = idempotency.process(&request_fixture("A")).await.unwrap();
        let b = idempotency.process(&request_fixture("B")).await.unwrap();

        assert_ne!(a.transaction_id, b.transaction_id);
        assert_eq!(inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_emits_hit_event() {
        let sink = Arc::new(CollectingEventSink::new());
        let inner = Arc::new(RecordingProcessor::succeeding());
        let idempotency = interceptor(&inner).with_event_sink(sink.clone());
        let request = request_fixture("A");

        idempotency.process(&request).await.unwrap();
        assert!(sink.is_empty());

        idempotency.process(&request).await.unwrap();
        let hits = sink.events_named(events::IDEMPOTENCY_HIT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field("key"), Some(&serde_json::json!("A")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_reach_inner_once() {
        let inner = Arc::new(
            RecordingProcessor::succeeding().with_latency(Duration::from_millis(50)),
        );
        let idempotency = Arc::new(interceptor(&inner));
        let request = request_fixture("A");

        let calls = (0..8).map(|_| {
            let idempotency = Arc::clone(&idempotency);
            let request = request.clone();
            tokio::spawn(async move { idempotency.process(&request).await })
        });
        let results = futures::future::join_all(calls).await;

        let ids: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap().transaction_id)
            .collect();
        assert_eq!(inner.call_count(), 1);
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert!(idempotency.store().in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_calls_release_their_key_locks() {
        let inner = Arc::new(
            RecordingProcessor::succeeding().with_latency(Duration::from_secs(10)),
        );
        let idempotency = interceptor(&inner);

        for i in 0..50 {
            let request = request_fixture(&format!("abandoned-{i}"));
            let outcome =
                tokio::time::timeout(Duration::from_millis(5), idempotency.process(&request))
                    .await;
            assert!(outcome.is_err());
        }

        assert_eq!(inner.call_count(), 50);
        assert_eq!(idempotency.store().in_flight.len(), 0);
        assert!(idempotency.store().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_waiter_leaves_lock_to_the_holder() {
        let inner = Arc::new(
            RecordingProcessor::succeeding().with_latency(Duration::from_millis(100)),
        );
        let idempotency = Arc::new(interceptor(&inner));

        let holder = {
            let idempotency = Arc::clone(&idempotency);
            tokio::spawn(async move { idempotency.process(&request_fixture("A")).await })
        };
        tokio::task::yield_now().await;

        let waiter = tokio::time::timeout(
            Duration::from_millis(5),
            idempotency.process(&request_fixture("A")),
        )
        .await;
        assert!(waiter.is_err());
        assert_eq!(idempotency.store().in_flight.len(), 1);

        assert!(holder.await.unwrap().unwrap().success);
        assert_eq!(inner.call_count(), 1);
        assert!(idempotency.store().in_flight.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unrelated_keys_do_not_wait_on_each_other() {
        let inner = Arc::new(
            RecordingProcessor::succeeding().with_latency(Duration::from_millis(200)),
        );
        let idempotency = Arc::new(interceptor(&inner));

        let started = std::time::Instant::now();
        let calls = ["A", "B", "C", "D"].map(|key| {
            let idempotency = Arc::clone(&idempotency);
            tokio::spawn(async move { idempotency.process(&request_fixture(key)).await })
        });
        for result in futures::future::join_all(calls).await {
            assert!(result.unwrap().unwrap().success);
        }

        assert_eq!(inner.call_count(), 4);
        assert!(started.elapsed() < Duration::from_millis(700));
    }
}
