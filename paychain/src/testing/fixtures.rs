//! Request fixtures for tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::PaymentRequest;

/// Card number accepted by validation.
pub const TEST_CARD_NUMBER: &str = "4111111111111111";
/// CVC accepted by validation.
pub const TEST_CVC: &str = "123";

/// Builds a valid request for `key` charging 100.00.
#[must_use]
pub fn request_fixture(key: &str) -> PaymentRequest {
    PaymentRequestFixture::new(key).build()
}

/// Builder for test requests. Starts from a valid request.
#[derive(Debug, Clone)]
pub struct PaymentRequestFixture {
    request: PaymentRequest,
}

impl PaymentRequestFixture {
    /// Starts a fixture for the given idempotency key.
    #[must_use]
    pub fn new(key: &str) -> Self {
        Self {
            request: PaymentRequest::new(
                key,
                dec!(100.00),
                TEST_CARD_NUMBER,
                "Jane Doe",
                "12/27",
                TEST_CVC,
            ),
        }
    }

    /// Sets the amount.
    #[must_use]
    pub fn amount(mut self, amount: Decimal) -> Self {
        self.request.amount = amount;
        self
    }

    /// Sets the card number.
    #[must_use]
    pub fn card_number(mut self, card_number: &str) -> Self {
        self.request.card_number = card_number.to_string();
        self
    }

    /// Sets the CVC.
    #[must_use]
    pub fn cvc(mut self, cvc: &str) -> Self {
        self.request.cvc = cvc.to_string();
        self
    }

    /// Sets the expiration date.
    #[must_use]
    pub fn expiration_date(mut self, expiration_date: &str) -> Self {
        self.request.expiration_date = expiration_date.to_string();
        self
    }

    /// Returns the built request.
    #[must_use]
    pub fn build(self) -> PaymentRequest {
        self.request
    }
}
