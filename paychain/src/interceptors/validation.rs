//! Request validation interceptor.
//!
//! Rejections are ordinary responses with `success = false`; the inner
//! processor is never called for a rejected request.

use crate::core::{PaymentRequest, PaymentResponse};
use crate::errors::ProcessingResult;
use crate::processors::PaymentProcessor;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

/// Rejection message for a missing idempotency key.
pub const MISSING_IDEMPOTENCY_KEY: &str = "Idempotency key is required";
/// Rejection message for a non-positive amount.
pub const NON_POSITIVE_AMOUNT: &str = "Amount must be greater than 0";
/// Rejection message for a malformed card number.
pub const INVALID_CARD_NUMBER: &str = "Invalid card number";
/// Rejection message for a malformed CVC.
pub const INVALID_CVC: &str = "Invalid CVC";

const CARD_NUMBER_LENGTH: usize = 16;
const CVC_LENGTH: usize = 3;

/// Checks a request against the validation rules, in order.
///
/// Returns the message of the first rule that fails, or `None` if the
/// request is acceptable. Expiration date and cardholder name are not
/// checked.
#[must_use]
pub fn validate_request(request: &PaymentRequest) -> Option<&'static str> {
    if request.idempotency_key.is_empty() {
        return Some(MISSING_IDEMPOTENCY_KEY);
    }
    if request.amount <= Decimal::ZERO {
        return Some(NON_POSITIVE_AMOUNT);
    }
    if !is_digits_of_length(&request.card_number, CARD_NUMBER_LENGTH) {
        return Some(INVALID_CARD_NUMBER);
    }
    if !is_digits_of_length(&request.cvc, CVC_LENGTH) {
        return Some(INVALID_CVC);
    }
    None
}

fn is_digits_of_length(value: &str, length: usize) -> bool {
    value.len() == length && value.bytes().all(|b| b.is_ascii_digit())
}

/// Interceptor that rejects malformed requests before any processing.
pub struct ValidationInterceptor {
    inner: Box<dyn PaymentProcessor>,
}

impl ValidationInterceptor {
    /// Creates a new validation interceptor.
    pub fn new<P>(inner: P) -> Self
    where
        P: PaymentProcessor + 'static,
    {
        Self {
            inner: Box::new(inner),
        }
    }
}

#[async_trait]
impl PaymentProcessor for ValidationInterceptor {
    fn name(&self) -> &str {
        "validation"
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        if let Some(reason) = validate_request(request) {
            debug!(
                stage = self.name(),
                idempotency_key = %request.idempotency_key,
                reason,
                "Request rejected"
            );
            return Ok(PaymentResponse::failure(request.amount, reason));
        }

        self.inner.process(request).await
    }
}
