//! Retry interceptor with backoff strategies.
//!
//! Only [`FailureKind::Transient`](crate::errors::FailureKind) errors are
//! retried. Once attempts run out the error is converted into a failed
//! [`PaymentResponse`], so no transient error crosses this layer's boundary.

use crate::cancellation::CancellationToken;
use crate::core::{PaymentRequest, PaymentResponse};
use crate::errors::{PaychainError, ProcessingError, ProcessingResult};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::processors::PaymentProcessor;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base
    #[default]
    Constant,
    /// delay = base * attempt
    Linear,
    /// delay = base * 2^(attempt - 1)
    Exponential,
}

impl BackoffStrategy {
    /// Calculates the delay after the given (1-indexed) failed attempt.
    #[must_use]
    pub fn delay(self, base: Duration, attempt: u32) -> Duration {
        match self {
            Self::Constant => base,
            Self::Linear => base.saturating_mul(attempt.max(1)),
            Self::Exponential => {
                base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            }
        }
    }
}

/// Jitter strategy for adding randomness to delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter.
    #[default]
    None,
    /// Full jitter: [0, delay].
    Full,
    /// Equal jitter: [delay/2, delay].
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay.
    #[must_use]
    pub fn apply(self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            return delay;
        }

        let mut rng = rand::thread_rng();
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(rng.gen_range(0..=millis)),
            Self::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + rng.gen_range(0..=millis - half))
            }
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds.
    pub delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
            max_delay_ms: 30_000,
            backoff: BackoffStrategy::Constant,
            jitter: JitterStrategy::None,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_delay_ms(mut self, delay: u64) -> Self {
        self.delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<(), PaychainError> {
        if self.max_attempts == 0 {
            return Err(PaychainError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Calculates the wait after the given (1-indexed) failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = Duration::from_millis(self.delay_ms);
        let capped = self
            .backoff
            .delay(base, attempt)
            .min(Duration::from_millis(self.max_delay_ms));
        self.jitter.apply(capped)
    }
}

/// Interceptor that re-invokes its inner processor on transient failure.
pub struct RetryInterceptor {
    inner: Box<dyn PaymentProcessor>,
    config: RetryConfig,
    sink: Arc<dyn EventSink>,
    cancellation: Option<Arc<CancellationToken>>,
}

impl RetryInterceptor {
    /// Creates a new retry interceptor.
    ///
    /// A `max_attempts` of zero is treated as one.
    pub fn new<P>(inner: P, config: RetryConfig) -> Self
    where
        P: PaymentProcessor + 'static,
    {
        let config = RetryConfig {
            max_attempts: config.max_attempts.max(1),
            ..config
        };
        Self {
            inner: Box::new(inner),
            config,
            sink: Arc::new(NoOpEventSink),
            cancellation: None,
        }
    }

    /// Creates a retry interceptor with a constant delay.
    pub fn constant<P>(inner: P, max_attempts: u32, delay: Duration) -> Self
    where
        P: PaymentProcessor + 'static,
    {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self::new(
            inner,
            RetryConfig::new()
                .with_max_attempts(max_attempts)
                .with_delay_ms(delay_ms),
        )
    }

    /// Sets the sink that receives retry events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets a shutdown token checked before every re-attempt.
    ///
    /// Cancelling the token also cuts a pending backoff short. It stays
    /// cancelled for every later call.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the effective configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn check_cancelled(&self) -> Result<(), ProcessingError> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(ProcessingError::cancelled(
                token.reason().unwrap_or_else(|| "cancelled".to_string()),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProcessor for RetryInterceptor {
    fn name(&self) -> &str {
        "retry"
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.inner.process(request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() => err,
                Err(err) => return Err(err),
            };

            if attempt >= self.config.max_attempts {
                warn!(
                    stage = self.name(),
                    idempotency_key = %request.idempotency_key,
                    attempts = attempt,
                    error = %err,
                    "Retries exhausted"
                );
                self.sink
                    .emit(
                        events::RETRIES_EXHAUSTED,
                        Some(serde_json::json!({
                            "stage": self.name(),
                            "attempts": attempt,
                            "error": err.description(),
                        })),
                    )
                    .await;
                return Ok(PaymentResponse::failure(
                    request.amount,
                    format!(
                        "Payment failed after {attempt} attempts: {}",
                        err.description()
                    ),
                ));
            }

            self.check_cancelled()?;

            let delay = self.config.delay_for(attempt);
            debug!(
                stage = self.name(),
                idempotency_key = %request.idempotency_key,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Retrying after transient failure"
            );
            self.sink
                .emit(
                    events::RETRY_SCHEDULED,
                    Some(serde_json::json!({
                        "stage": self.name(),
                        "attempt": attempt,
                        "max_attempts": self.config.max_attempts,
                        "delay_ms": u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "error": err.description(),
                    })),
                )
                .await;

            match &self.cancellation {
                Some(token) => {
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = token.cancelled() => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }

            self.check_cancelled()?;
        }
    }
}
