//! Pipeline builder and the assembled pipeline.

use super::config::PipelineConfig;
use super::layer::{validate_layers, Layer};
use crate::cancellation::CancellationToken;
use crate::core::PaymentRequest;
use crate::errors::{PaychainError, ProcessingResult};
use crate::events::{EventSink, LoggingEventSink};
use crate::interceptors::{
    IdempotencyInterceptor, IdempotencyStore, LoggingInterceptor, MetricsInterceptor,
    MetricsRecorder, MetricsSnapshot, RetryConfig, RetryInterceptor, ValidationInterceptor,
};
use crate::processors::{BoxedProcessor, PaymentProcessor};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Builder composing interceptors around a gateway.
///
/// Defaults to [`Layer::DEFAULT_ORDER`].
///
/// ```rust
/// use paychain::prelude::*;
/// use std::sync::Arc;
///
/// let pipeline = PipelineBuilder::new()
///     .with_retry(RetryConfig::new().with_delay_ms(300))
///     .with_event_sink(Arc::new(NoOpEventSink))
///     .build(TransactionGateway::reliable())
///     .unwrap();
///
/// assert_eq!(pipeline.layers(), &Layer::DEFAULT_ORDER);
/// assert!(pipeline.metrics().is_some());
/// ```
#[derive(Clone)]
pub struct PipelineBuilder {
    layers: Vec<Layer>,
    retry: RetryConfig,
    sink: Arc<dyn EventSink>,
    cancellation: Option<Arc<CancellationToken>>,
}

impl PipelineBuilder {
    /// Creates a builder with the default layer order and retry settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: Layer::DEFAULT_ORDER.to_vec(),
            retry: RetryConfig::default(),
            sink: Arc::new(LoggingEventSink::default()),
            cancellation: None,
        }
    }

    /// Creates a builder from configuration.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new()
            .with_layers(config.layers.iter().copied())
            .with_retry(config.retry.clone())
    }

    /// Replaces the layer list, outermost first.
    #[must_use]
    pub fn with_layers(mut self, layers: impl IntoIterator<Item = Layer>) -> Self {
        self.layers = layers.into_iter().collect();
        self
    }

    /// Sets the retry layer configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the sink shared by every interceptor that emits events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets a shutdown token the retry layer checks before every re-attempt.
    ///
    /// The token is shared by every call through the pipeline and cannot be
    /// reset: once cancelled, each later call gets its first attempt only and
    /// any transient failure comes back as `ProcessingError::Cancelled`.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Checks the layer list and retry settings.
    pub fn validate(&self) -> Result<(), PaychainError> {
        validate_layers(&self.layers)?;
        self.retry.validate()
    }

    /// Wraps `gateway` in the configured layers.
    ///
    /// Layers are applied innermost first, so the first entry of the list
    /// ends up outermost.
    pub fn build<P>(self, gateway: P) -> Result<Pipeline, PaychainError>
    where
        P: PaymentProcessor + 'static,
    {
        self.validate()?;

        let mut metrics = None;
        let mut idempotency = None;
        let mut processor: BoxedProcessor = Box::new(gateway);

        for layer in self.layers.iter().rev() {
            let wrapped: BoxedProcessor = match layer {
                Layer::Validation => Box::new(ValidationInterceptor::new(processor)),
                Layer::Idempotency => {
                    let store = Arc::new(IdempotencyStore::new());
                    idempotency = Some(Arc::clone(&store));
                    Box::new(
                        IdempotencyInterceptor::new(processor, store)
                            .with_event_sink(Arc::clone(&self.sink)),
                    )
                }
                Layer::Retry => {
                    let mut retry = RetryInterceptor::new(processor, self.retry.clone())
                        .with_event_sink(Arc::clone(&self.sink));
                    if let Some(token) = &self.cancellation {
                        retry = retry.with_cancellation(Arc::clone(token));
                    }
                    Box::new(retry)
                }
                Layer::Logging => Box::new(
                    LoggingInterceptor::new(processor).with_event_sink(Arc::clone(&self.sink)),
                ),
                Layer::Metrics => {
                    let recorder = Arc::new(MetricsRecorder::new());
                    metrics = Some(Arc::clone(&recorder));
                    Box::new(MetricsInterceptor::new(processor, recorder))
                }
            };
            processor = wrapped;
        }

        debug!(
            layers = ?self.layers,
            max_attempts = self.retry.max_attempts,
            delay_ms = self.retry.delay_ms,
            "Pipeline assembled"
        );

        Ok(Pipeline {
            processor,
            layers: self.layers,
            metrics,
            idempotency,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("layers", &self.layers)
            .field("retry", &self.retry)
            .field("cancellable", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

/// An assembled pipeline plus handles to the state its layers own.
///
/// Meant to be long-lived and shared: the idempotency cache and metrics
/// accumulate across calls.
pub struct Pipeline {
    processor: BoxedProcessor,
    layers: Vec<Layer>,
    metrics: Option<Arc<MetricsRecorder>>,
    idempotency: Option<Arc<IdempotencyStore>>,
}

impl Pipeline {
    /// Returns the layers, outermost first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns the metrics recorder, if the pipeline has a metrics layer.
    #[must_use]
    pub fn metrics(&self) -> Option<&Arc<MetricsRecorder>> {
        self.metrics.as_ref()
    }

    /// Returns a metrics snapshot, if the pipeline has a metrics layer.
    #[must_use]
    pub fn metrics_snapshot(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(|m| m.snapshot())
    }

    /// Returns the idempotency store, if the pipeline has an idempotency layer.
    #[must_use]
    pub fn idempotency_store(&self) -> Option<&Arc<IdempotencyStore>> {
        self.idempotency.as_ref()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("layers", &self.layers)
            .field("outermost", &self.processor.name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentProcessor for Pipeline {
    fn name(&self) -> &str {
        "pipeline"
    }

    async fn process(&self, request: &PaymentRequest) -> ProcessingResult {
        self.processor.process(request).await
    }
}
