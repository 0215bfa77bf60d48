//! Error types for the paychain pipeline.
//!
//! Two families live here. [`ProcessingError`] is what a processor signals
//! when a call fails exceptionally; its [`FailureKind`] tag is what the retry
//! layer matches on. [`PaychainError`] covers setting a pipeline up: bad
//! configuration, an invalid layer order, or unreadable config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type returned by every processor in the chain.
pub type ProcessingResult = Result<crate::core::PaymentResponse, ProcessingError>;

/// Tag distinguishing how a processing failure should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retrying may succeed.
    Transient,
    /// Retrying will not help.
    Permanent,
    /// The caller cancelled the operation.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// An exceptional failure raised while processing a payment.
///
/// Validation rejections are not errors: they come back as a
/// `PaymentResponse` with `success = false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    /// A failure that may go away on retry (gateway timeout, flaky network).
    #[error("Transient failure: {message}")]
    Transient {
        /// Description of the failure.
        message: String,
    },

    /// A failure that will not go away on retry.
    #[error("Permanent failure: {message}")]
    Permanent {
        /// Description of the failure.
        message: String,
    },

    /// Processing was cancelled before it could complete.
    #[error("Processing cancelled: {reason}")]
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

impl ProcessingError {
    /// Creates a transient error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Creates a permanent error.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Returns the failure kind tag.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transient { .. } => FailureKind::Transient,
            Self::Permanent { .. } => FailureKind::Permanent,
            Self::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    /// Returns true if the failure is worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }

    /// Returns the description without the kind prefix.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Transient { message } | Self::Permanent { message } => message,
            Self::Cancelled { reason } => reason,
        }
    }
}

/// The main error type for setting up and configuring pipelines.
#[derive(Debug, Error)]
pub enum PaychainError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The pipeline definition is malformed.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when a pipeline's layer list is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The layers involved in the error.
    pub layers: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            layers: Vec::new(),
        }
    }

    /// Sets the layers involved.
    #[must_use]
    pub fn with_layers(mut self, layers: Vec<String>) -> Self {
        self.layers = layers;
        self
    }
}
