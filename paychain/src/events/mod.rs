//! Event sink system for observability.
//!
//! Interceptors report what they observe as `(event_type, data)` pairs.
//! Every payload carries a `stage` field naming the emitting layer.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// A request entered the logging layer.
pub const PAYMENT_STARTED: &str = "payment.started";
/// A request left the logging layer with a response.
pub const PAYMENT_COMPLETED: &str = "payment.completed";
/// A request left the logging layer with a propagated error.
pub const PAYMENT_FAILED: &str = "payment.failed";
/// The retry layer is about to wait and try again.
pub const RETRY_SCHEDULED: &str = "payment.retry_scheduled";
/// The retry layer gave up after its last attempt.
pub const RETRIES_EXHAUSTED: &str = "payment.retries_exhausted";
/// The idempotency layer served a cached response.
pub const IDEMPOTENCY_HIT: &str = "payment.idempotency_hit";
