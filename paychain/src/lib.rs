//! # Paychain
//!
//! A payment-processing pipeline built from stackable interceptors.
//!
//! A simulated [`TransactionGateway`](gateway::TransactionGateway) does the
//! actual work and occasionally fails transiently. Interceptors wrap it,
//! each implementing the same [`PaymentProcessor`](processors::PaymentProcessor)
//! trait as the thing it wraps:
//!
//! - **Validation**: rejects malformed requests before anything else runs
//! - **Idempotency**: replays the first successful response for a key
//! - **Retry**: re-invokes the gateway on transient failure
//! - **Logging**: emits start/end/failure events
//! - **Metrics**: counts outcomes and durations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paychain::prelude::*;
//! use rust_decimal_macros::dec;
//!
//! # async fn run() -> Result<(), PaychainError> {
//! let pipeline = PipelineBuilder::new().build(TransactionGateway::default())?;
//!
//! let request = PaymentRequest::new(
//!     "order-1",
//!     dec!(100.00),
//!     "4111111111111111",
//!     "Jane Doe",
//!     "12/27",
//!     "123",
//! );
//! match pipeline.process(&request).await {
//!     Ok(response) => println!("{response}"),
//!     Err(err) => eprintln!("{err}"),
//! }
//!
//! if let Some(snapshot) = pipeline.metrics_snapshot() {
//!     println!("{snapshot}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod core;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod interceptors;
pub mod pipeline;
pub mod processors;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::core::{mask_card_number, PaymentRequest, PaymentResponse};
    pub use crate::errors::{
        FailureKind, PaychainError, PipelineValidationError, ProcessingError, ProcessingResult,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::gateway::{
        AlwaysFail, FailFirst, FailureSource, GatewayConfig, NeverFail, RandomFailure,
        TransactionGateway,
    };
    pub use crate::interceptors::{
        BackoffStrategy, IdempotencyInterceptor, IdempotencyStore, JitterStrategy,
        LoggingInterceptor, MetricsInterceptor, MetricsRecorder, MetricsSnapshot, RetryConfig,
        RetryInterceptor, ValidationInterceptor,
    };
    pub use crate::pipeline::{Layer, Pipeline, PipelineBuilder, PipelineConfig};
    pub use crate::processors::{BoxedProcessor, FnProcessor, PaymentProcessor};
}
