//! Testing utilities for paychain pipelines.
//!
//! This module provides:
//! - A recording, scriptable mock processor
//! - Request fixtures that pass validation by default

mod fixtures;
mod mocks;

pub use fixtures::{request_fixture, PaymentRequestFixture, TEST_CARD_NUMBER, TEST_CVC};
pub use mocks::RecordingProcessor;
