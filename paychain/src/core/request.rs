//! Payment request value object.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Mask placed in front of the visible card digits.
pub const CARD_MASK: &str = "**** **** **** ";

/// An incoming payment request.
///
/// Requests are plain values: every layer of the pipeline receives a shared
/// reference and none of them mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Caller-supplied key guaranteeing at-most-once successful processing.
    pub idempotency_key: String,
    /// Amount to charge. Must be strictly positive to pass validation.
    pub amount: Decimal,
    /// Card number, expected to be 16 digits.
    pub card_number: String,
    /// Cardholder name. Not validated.
    pub cardholder_name: String,
    /// Expiration date as supplied by the caller (e.g. `12/27`). Not validated.
    pub expiration_date: String,
    /// Card verification code, expected to be 3 digits.
    pub cvc: String,
}

impl PaymentRequest {
    /// Creates a new payment request.
    #[must_use]
    pub fn new(
        idempotency_key: impl Into<String>,
        amount: Decimal,
        card_number: impl Into<String>,
        cardholder_name: impl Into<String>,
        expiration_date: impl Into<String>,
        cvc: impl Into<String>,
    ) -> Self {
        Self {
            idempotency_key: idempotency_key.into(),
            amount,
            card_number: card_number.into(),
            cardholder_name: cardholder_name.into(),
            expiration_date: expiration_date.into(),
            cvc: cvc.into(),
        }
    }

    /// Returns the card number with everything but the last four digits masked.
    #[must_use]
    pub fn masked_card_number(&self) -> String {
        mask_card_number(&self.card_number)
    }
}

/// Masks a card number, revealing only its last four characters.
///
/// The mask is a fixed-length placeholder so the output never leaks the
/// length of the original number. Inputs shorter than four characters are
/// masked entirely.
#[must_use]
pub fn mask_card_number(card_number: &str) -> String {
    let count = card_number.chars().count();
    if count < 4 {
        return CARD_MASK.trim_end().to_string();
    }
    let last_four: String = card_number.chars().skip(count - 4).collect();
    format!("{CARD_MASK}{last_four}")
}
