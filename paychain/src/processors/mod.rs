//! The processor trait shared by the gateway, every interceptor and the
//! assembled pipeline.
//!
//! Anything that can turn a [`PaymentRequest`] into a [`PaymentResponse`]
//! implements [`PaymentProcessor`], which is what lets interceptors wrap one
//! another transparently.

use crate::core::{PaymentRequest, PaymentResponse};
use crate::errors::{ProcessingError, ProcessingResult};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Trait for components that can process a payment request.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Returns the name of the processor, used as the `stage` field in events.
    fn name(&self) -> &str;

    /// Processes a payment request.
    ///
    /// Returns a response for every completed call, including rejections.
    /// Returns an error only for exceptional failures; see [`ProcessingError`].
    async fn process(&self, request: &PaymentRequest) -> ProcessingResult;
}

#[async_trait]
impl<P> PaymentProcessor for Arc<P>
where
    P: PaymentProcessor + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        (**self).process(request).await
    }
}

#[async_trait]
impl<P> PaymentProcessor for Box<P>
where
    P: PaymentProcessor + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        (**self).process(request).await
    }
}

/// A boxed processor, the unit of ownership inside a chain.
pub type BoxedProcessor = Box<dyn PaymentProcessor>;

/// A simple function-based processor.
pub struct FnProcessor<F>
where
    F: Fn(&PaymentRequest) -> Result<PaymentResponse, ProcessingError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(&PaymentRequest) -> Result<PaymentResponse, ProcessingError> + Send + Sync,
{
    /// Creates a new function-based processor.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnProcessor<F>
where
    F: Fn(&PaymentRequest) -> Result<PaymentResponse, ProcessingError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProcessor")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F> PaymentProcessor for FnProcessor<F>
where
    F: Fn(&PaymentRequest) -> Result<PaymentResponse, ProcessingError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        (self.func)(request)
    }
}
