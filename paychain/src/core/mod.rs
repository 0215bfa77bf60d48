//! Core value objects passed through every pipeline layer.

mod request;
mod response;

pub use request::{mask_card_number, PaymentRequest, CARD_MASK};
pub use response::{PaymentResponse, SUCCESS_MESSAGE};
