//! Payment response value object.

use crate::utils::{now_utc, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message attached to every successful gateway response.
pub const SUCCESS_MESSAGE: &str = "Payment processed successfully";

/// The outcome of processing a [`PaymentRequest`](super::PaymentRequest).
///
/// Responses are immutable once built, so the idempotency cache can hand
/// out clones of the same response repeatedly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    /// Whether the payment went through.
    pub success: bool,
    /// Gateway-assigned transaction identifier. Present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Human-readable outcome description.
    pub message: String,
    /// Amount echoed from the request.
    pub amount: Decimal,
    /// When this response was built.
    pub processed_at: Timestamp,
}

impl PaymentResponse {
    /// Creates a successful response.
    #[must_use]
    pub fn success(transaction_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id.into()),
            message: SUCCESS_MESSAGE.to_string(),
            amount,
            processed_at: now_utc(),
        }
    }

    /// Creates a failed response carrying a reason.
    #[must_use]
    pub fn failure(amount: Decimal, message: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            message: message.into(),
            amount,
            processed_at: now_utc(),
        }
    }

    /// Returns true if the payment failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.success
    }
}

impl fmt::Display for PaymentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.transaction_id {
            Some(id) => write!(f, "[ok] {} ({}, amount {})", self.message, id, self.amount),
            None => write!(f, "[failed] {} (amount {})", self.message, self.amount),
        }
    }
}
