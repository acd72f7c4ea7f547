//! Configuration structures for the udf-runtime.
//!
//! This module defines configuration options for the engine:
//! - [`RuntimeConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Engine-wide settings (cache sizing)
//! - [`ExecutionConfig`]: Per-invocation settings (result conversion limits)

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
///
/// This structure contains all configuration options for the udf-runtime.
/// It can be embedded in a host's own configuration and loaded from files
/// (TOML, JSON) or environment variables by the host.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Engine-wide configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-invocation execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Initial capacity of the compiled-function cache.
    ///
    /// The cache grows without bound (entries are never evicted), so this
    /// is a sizing hint, not a limit.
    #[serde(default = "defaults::cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: defaults::cache_capacity(),
        }
    }
}

/// Per-invocation execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Maximum nesting depth when converting a function's result back to
    /// JSON.
    ///
    /// User code can return arbitrarily nested (or cyclic) object graphs;
    /// conversion stops with an execution error once this depth is
    /// exceeded.
    #[serde(default = "defaults::max_result_depth")]
    pub max_result_depth: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_result_depth: defaults::max_result_depth(),
        }
    }
}

/// Default value functions for serde.
mod defaults {
    pub const fn cache_capacity() -> usize {
        64
    }

    pub const fn max_result_depth() -> u32 {
        64
    }
}
