//! The user-function execution engine.
//!
//! [`UdfEngine`] ties the pieces together: cache lookup, blob retrieval,
//! compilation, and canonical invocation. It is the entry point used by the
//! host runtime that dispatches UDF steps.

use std::sync::Arc;

use pyo3::prelude::*;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::blob::{BlobStore, UdfRequest};
use crate::cache::FunctionCache;
use udf_runtime_common::{RuntimeConfig, UdfError};

/// Dynamic user-function execution engine.
///
/// Given a blob id resolving to stored source code, a declared input
/// schema, and an optional function name, the engine compiles the code at
/// most once per process, caches the resulting callable, validates every
/// invocation's input, and executes the function inside a restricted
/// evaluation environment.
///
/// # Thread Safety
///
/// The engine is shared across tasks; the compiled-function cache is its
/// only mutable state. Invocations for different blob ids — and for the
/// same blob id — are independent and carry no ordering guarantee.
pub struct UdfEngine {
    cache: FunctionCache,
    blobs: Arc<dyn BlobStore>,
    config: RuntimeConfig,
}

impl UdfEngine {
    /// Create an engine with default configuration.
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_config(blobs, RuntimeConfig::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(blobs: Arc<dyn BlobStore>, config: RuntimeConfig) -> Self {
        Self {
            cache: FunctionCache::with_capacity(config.engine.cache_capacity),
            blobs,
            config,
        }
    }

    /// Execute the user function stored under `blob_id` with `input`.
    ///
    /// The first call for a blob id fetches and compiles its code; later
    /// calls reuse the cached entry. Input is validated against the blob's
    /// declared schema before the function runs. `context` is an opaque
    /// object forwarded unchanged into user code when its signature asks
    /// for it.
    ///
    /// # Errors
    ///
    /// Any [`UdfError`]: retrieval, record shape, and compilation errors on
    /// the first call; validation and execution errors on every call.
    /// Failures are surfaced, never retried here; compilation failures are
    /// not cached, and an invocation failure leaves the compiled entry
    /// usable for future, valid inputs.
    #[instrument(skip(self, input, context))]
    pub async fn execute(
        &self,
        blob_id: &str,
        input: &Value,
        context: &Py<PyAny>,
    ) -> Result<Value, UdfError> {
        let entry = self.cache.get_or_compile(blob_id, self.blobs.as_ref()).await?;

        let result = entry.invoke(input, context, &self.config.execution).await?;
        debug!(blob_id, "user function completed");
        Ok(result)
    }

    /// Execute a [`UdfRequest`], the wire shape dispatched by the host.
    pub async fn execute_request(
        &self,
        request: &UdfRequest,
        context: &Py<PyAny>,
    ) -> Result<Value, UdfError> {
        self.execute(&request.blob_id, &request.input, context).await
    }

    /// The compiled-function cache.
    pub fn cache(&self) -> &FunctionCache {
        &self.cache
    }

    /// The engine configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl std::fmt::Debug for UdfEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdfEngine")
            .field("cached_functions", &self.cache.len())
            .finish_non_exhaustive()
    }
}
