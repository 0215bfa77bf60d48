//! Pipeline configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```json
//! { "retry": { "max_attempts": 5, "delay_ms": 300 }, "gateway": { "seed": 42 } }
//! ```

use super::layer::{validate_layers, Layer};
use crate::errors::PaychainError;
use crate::gateway::GatewayConfig;
use crate::interceptors::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a complete pipeline and its gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Layers, outermost first.
    pub layers: Vec<Layer>,
    /// Retry layer settings.
    pub retry: RetryConfig,
    /// Simulated gateway settings.
    pub gateway: GatewayConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            layers: Layer::DEFAULT_ORDER.to_vec(),
            retry: RetryConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, PaychainError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PaychainError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks every section of the configuration.
    pub fn validate(&self) -> Result<(), PaychainError> {
        validate_layers(&self.layers)?;
        self.retry.validate()?;
        self.gateway.validate()
    }
}
