//! Cooperative cancellation for in-flight payments.

mod token;

pub use token::{CancelCallback, CancellationToken};
