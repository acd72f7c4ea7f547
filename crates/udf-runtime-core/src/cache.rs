//! Blob-keyed compiled-function cache.
//!
//! [`FunctionCache`] memoizes the compiler's output per blob id so
//! recompilation happens at most once per process lifetime per blob id.
//! It is an explicit component with its own constructor — not ambient
//! module state — so tests can build isolated instances.
//!
//! Entries are never evicted and have no TTL; the cache grows for the life
//! of the process. Invalidation, if ever needed, belongs to a deliberate
//! separate design, not here.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::blob::{BlobRecord, BlobStore};
use crate::compiler::CompiledUdf;
use udf_runtime_common::UdfError;

/// Process-scoped cache of compiled user functions, keyed by blob id.
///
/// # Thread Safety
///
/// Backed by a sharded concurrent map: reads never raise while a write is
/// in flight, and insertion is atomic per key. No lock is held across the
/// asynchronous blob fetch, so a true first-miss race may compile the same
/// blob twice; compilation is a pure function of the blob's contents, so
/// the duplicate work is wasteful but never incorrect, and all callers
/// converge on a single stored entry.
#[derive(Debug, Default)]
pub struct FunctionCache {
    entries: DashMap<String, Arc<CompiledUdf>>,
}

impl FunctionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Create an empty cache with an initial capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
        }
    }

    /// Get the cached entry for `blob_id`, if one exists.
    pub fn get(&self, blob_id: &str) -> Option<Arc<CompiledUdf>> {
        self.entries.get(blob_id).map(|entry| Arc::clone(&entry))
    }

    /// Get the compiled entry for `blob_id`, fetching and compiling on a
    /// miss.
    ///
    /// On a hit the blob store is never touched. On a miss the blob is
    /// fetched, its record validated, and the code compiled; the entry is
    /// only published after compilation fully succeeds, so failures — and
    /// cancelled invocations — leave no trace in the cache and the next
    /// call retries from scratch.
    ///
    /// # Errors
    ///
    /// - [`UdfError::BlobRetrieval`] when the store fails (never cached)
    /// - [`UdfError::MalformedBlob`] when the record is missing `code` or
    ///   `input_schema`
    /// - compilation errors from [`CompiledUdf::compile`]
    pub async fn get_or_compile(
        &self,
        blob_id: &str,
        store: &dyn BlobStore,
    ) -> Result<Arc<CompiledUdf>, UdfError> {
        if let Some(entry) = self.get(blob_id) {
            debug!(blob_id, "using cached function");
            return Ok(entry);
        }

        info!(blob_id, "loading and compiling function");

        let raw = store
            .get_blob(blob_id)
            .await
            .map_err(|e| UdfError::blob_retrieval(blob_id, e))?;
        let record = BlobRecord::from_value(blob_id, &raw)?;

        let compiled = Arc::new(CompiledUdf::compile(
            &record.code,
            record.function_name.as_deref(),
            &record.input_schema,
        )?);

        // Atomic per key: a concurrent first-miss racer that lost keeps the
        // entry that is already stored.
        let entry = self
            .entries
            .entry(blob_id.to_string())
            .or_insert(compiled)
            .value()
            .clone();
        Ok(entry)
    }

    /// Returns `true` if an entry exists for `blob_id`.
    pub fn contains(&self, blob_id: &str) -> bool {
        self.entries.contains_key(blob_id)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
