//! Simulated payment gateway.
//!
//! The gateway performs no validation and assumes well-formed input. It is
//! the only place failures are injected: a [`FailureSource`] decides per call
//! whether to signal a transient error.

mod failure;

pub use failure::{AlwaysFail, FailFirst, FailureSource, NeverFail, RandomFailure};

use crate::core::{PaymentRequest, PaymentResponse};
use crate::errors::{PaychainError, ProcessingError, ProcessingResult};
use crate::processors::PaymentProcessor;
use crate::utils::generate_transaction_id;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Description attached to every injected transient failure.
pub const GATEWAY_UNAVAILABLE: &str = "Payment gateway temporarily unavailable";

/// Configuration for the simulated gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Probability in `[0, 1]` that a call fails transiently.
    pub failure_probability: f64,
    /// Seed for a deterministic failure sequence.
    pub seed: Option<u64>,
    /// Simulated processing latency in milliseconds.
    pub latency_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            failure_probability: 0.05,
            seed: None,
            latency_ms: 0,
        }
    }
}

impl GatewayConfig {
    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<(), PaychainError> {
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(PaychainError::Config(format!(
                "gateway.failure_probability must be within [0, 1], got {}",
                self.failure_probability
            )));
        }
        Ok(())
    }
}

/// The innermost processor: assigns transaction ids or fails transiently.
pub struct TransactionGateway {
    failure: Box<dyn FailureSource>,
    latency: Duration,
    invocations: AtomicU64,
}

impl TransactionGateway {
    /// Creates a gateway driven by `failure`.
    pub fn new<F>(failure: F) -> Self
    where
        F: FailureSource + 'static,
    {
        Self {
            failure: Box::new(failure),
            latency: Duration::ZERO,
            invocations: AtomicU64::new(0),
        }
    }

    /// Creates a gateway that never fails.
    #[must_use]
    pub fn reliable() -> Self {
        Self::new(NeverFail)
    }

    /// Creates a gateway failing with `probability`, seeded from entropy.
    #[must_use]
    pub fn with_failure_probability(probability: f64) -> Self {
        Self::new(RandomFailure::new(probability))
    }

    /// Creates a gateway from configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let failure = match config.seed {
            Some(seed) => RandomFailure::seeded(config.failure_probability, seed),
            None => RandomFailure::new(config.failure_probability),
        };
        Self::new(failure).with_latency(Duration::from_millis(config.latency_ms))
    }

    /// Adds a simulated delay to every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns how many times the gateway has been called.
    #[must_use]
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Default for TransactionGateway {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

#[async_trait]
impl PaymentProcessor for TransactionGateway {
    fn name(&self) -> &str {
        "gateway"
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        let call = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failure.should_fail() {
            warn!(
                stage = self.name(),
                idempotency_key = %request.idempotency_key,
                call,
                "Gateway failure injected"
            );
            return Err(ProcessingError::transient(GATEWAY_UNAVAILABLE));
        }

        let transaction_id = generate_transaction_id();
        debug!(
            stage = self.name(),
            idempotency_key = %request.idempotency_key,
            transaction_id = %transaction_id,
            call,
            "Gateway accepted payment"
        );
        Ok(PaymentResponse::success(transaction_id, request.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{request_fixture, PaymentRequestFixture};
    use crate::utils::TRANSACTION_ID_PREFIX;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_reliable_gateway_succeeds() {
        let gateway = TransactionGateway::reliable();
        let request = PaymentRequestFixture::new("A").amount(dec!(42.50)).build();

        let response = gateway.process(&request).await.unwrap();

        assert!(response.success);
        assert_eq!(response.amount, dec!(42.50));
        assert!(response
            .transaction_id
            .as_deref()
            .is_some_and(|id| id.starts_with(TRANSACTION_ID_PREFIX)));
        assert_eq!(gateway.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_gateway_signals_transient() {
        let gateway = TransactionGateway::new(AlwaysFail);

        let err = gateway.process(&request_fixture("A")).await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(err.description(), GATEWAY_UNAVAILABLE);
        assert_eq!(gateway.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_gateway_does_not_validate() {
        let gateway = TransactionGateway::reliable();
        let request = PaymentRequestFixture::new("").amount(dec!(-1)).cvc("x").build();

        assert!(gateway.process(&request).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_transaction_ids_are_fresh() {
        let gateway = TransactionGateway::reliable();
        let request = request_fixture("A");

        let a = gateway.process(&request).await.unwrap();
        let b = gateway.process(&request).await.unwrap();

        assert_ne!(a.transaction_id, b.transaction_id);
        assert_eq!(gateway.invocation_count(), 2);
    }

    #[test]
    fn test_config_validation() {
        assert!(GatewayConfig::default().validate().is_ok());

        let config = GatewayConfig {
            failure_probability: 1.5,
            ..GatewayConfig::default()
        };
        assert!(matches!(config.validate(), Err(PaychainError::Config(_))));
    }

    #[tokio::test]
    async fn test_seeded_config_is_reproducible() {
        let config = GatewayConfig {
            failure_probability: 0.5,
            seed: Some(7),
            latency_ms: 0,
        };
        let a = TransactionGateway::from_config(&config);
        let b = TransactionGateway::from_config(&config);
        let request = request_fixture("A");

        for _ in 0..20 {
            let ra = a.process(&request).await.is_ok();
            let rb = b.process(&request).await.is_ok();
            assert_eq!(ra, rb);
        }
    }
}
