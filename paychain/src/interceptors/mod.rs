//! Interceptors (middleware) wrapping a payment processor.
//!
//! Each interceptor implements [`PaymentProcessor`](crate::processors::PaymentProcessor)
//! and exclusively owns the processor it wraps, so interceptors stack in any
//! order. The order still matters for what each one observes; see
//! [`Layer`](crate::pipeline::Layer).

mod idempotency;
mod logging;
mod metrics;
mod retry;
mod validation;

pub use idempotency::{IdempotencyInterceptor, IdempotencyStore};
pub use logging::LoggingInterceptor;
pub use metrics::{MetricsInterceptor, MetricsRecorder, MetricsSnapshot};
pub use retry::{BackoffStrategy, JitterStrategy, RetryConfig, RetryInterceptor};
pub use validation::{
    validate_request, ValidationInterceptor, INVALID_CARD_NUMBER, INVALID_CVC,
    MISSING_IDEMPOTENCY_KEY, NON_POSITIVE_AMOUNT,
};
