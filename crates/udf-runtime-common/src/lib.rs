//! Common types, errors, and configuration for udf-runtime.
//!
//! This crate provides shared functionality used across the udf-runtime
//! workspace:
//! - Error types using `thiserror` for type-safe error handling
//! - Configuration structures for runtime settings

pub mod config;
pub mod error;

pub use config::{EngineConfig, ExecutionConfig, RuntimeConfig};
pub use error::UdfError;
