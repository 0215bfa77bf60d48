//! The layers a pipeline can be assembled from.

use crate::errors::PipelineValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// One interceptor in a pipeline.
///
/// Layers are listed outermost first. The order decides what each layer
/// observes: with [`Layer::Metrics`] outside [`Layer::Validation`], rejected
/// requests are counted as processed calls; with [`Layer::Idempotency`]
/// inside [`Layer::Retry`], every retry consults the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Rejects malformed requests.
    Validation,
    /// Replays successful responses by idempotency key.
    Idempotency,
    /// Retries transient failures.
    Retry,
    /// Emits start/end/failure events.
    Logging,
    /// Counts outcomes and durations.
    Metrics,
}

impl Layer {
    /// The default order, outermost first.
    ///
    /// Validation fails fast before anything is cached or retried, the cache
    /// avoids redundant retries, retry wraps only the unreliable gateway
    /// path, and logging/metrics see only calls that reach the gateway.
    pub const DEFAULT_ORDER: [Self; 5] = [
        Self::Validation,
        Self::Idempotency,
        Self::Retry,
        Self::Logging,
        Self::Metrics,
    ];

    /// Returns the layer's name, matching the interceptor's `name()`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Idempotency => "idempotency",
            Self::Retry => "retry",
            Self::Logging => "logging",
            Self::Metrics => "metrics",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = PipelineValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::DEFAULT_ORDER
            .into_iter()
            .find(|layer| layer.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                PipelineValidationError::new(format!("Unknown layer '{s}'"))
                    .with_layers(vec![s.to_string()])
            })
    }
}

/// Checks that no layer appears twice.
pub fn validate_layers(layers: &[Layer]) -> Result<(), PipelineValidationError> {
    let mut seen = HashSet::new();
    for layer in layers {
        if !seen.insert(*layer) {
            return Err(
                PipelineValidationError::new(format!("Layer '{layer}' appears more than once"))
                    .with_layers(layers.iter().map(ToString::to_string).collect()),
            );
        }
    }
    Ok(())
}
