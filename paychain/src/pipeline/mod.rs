//! Pipeline assembly.
//!
//! This module provides:
//! - [`Layer`] and the default layer order
//! - [`PipelineConfig`] for file- or code-driven setup
//! - [`PipelineBuilder`] composing interceptors around a gateway
//! - [`Pipeline`], the assembled chain with handles to its metrics and cache

mod builder;
mod config;
mod layer;


pub use builder::{Pipeline, PipelineBuilder};
pub use config::PipelineConfig;
pub use layer::{validate_layers, Layer};
