//! Blob store collaborator and blob record parsing.
//!
//! The engine does not own storage. It fetches blob records through the
//! [`BlobStore`] trait and validates their shape here before anything is
//! compiled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use udf_runtime_common::UdfError;

/// A single user-function invocation request, as dispatched by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdfRequest {
    /// Opaque identifier of the stored function definition.
    pub blob_id: String,
    /// Invocation input, validated against the blob's declared schema.
    pub input: Value,
}

/// External blob storage.
///
/// Implementations resolve an opaque blob id to the stored record. The
/// engine treats any failure as a retrieval error for that id and never
/// caches it.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the blob record for `blob_id`.
    async fn get_blob(&self, blob_id: &str) -> anyhow::Result<Value>;
}

/// A parsed function-definition blob.
///
/// Invariant: `code` and `input_schema` are present and non-empty. Absence
/// is a fatal retrieval-side error, not a recoverable default.
#[derive(Debug, Clone)]
pub struct BlobRecord {
    /// User-authored source code.
    pub code: String,
    /// JSON Schema the invocation input must satisfy.
    pub input_schema: Value,
    /// Name of the function to resolve within `code`; absent for bare
    /// function bodies.
    pub function_name: Option<String>,
}

impl BlobRecord {
    /// Parse and validate the raw value returned by the blob store.
    ///
    /// # Errors
    ///
    /// Returns [`UdfError::MalformedBlob`] naming the offending field when
    /// the record is not a mapping, when `code` is missing or empty, when
    /// `input_schema` is missing or empty, or when `function_name` is
    /// present but not a string.
    pub fn from_value(blob_id: &str, raw: &Value) -> Result<Self, UdfError> {
        let Some(record) = raw.as_object() else {
            return Err(UdfError::malformed_blob(blob_id, "must contain a mapping"));
        };

        let code = match record.get("code") {
            Some(Value::String(code)) if !code.is_empty() => code.clone(),
            _ => {
                return Err(UdfError::malformed_blob(
                    blob_id,
                    "must contain a non-empty 'code' field",
                ));
            }
        };

        let input_schema = match record.get("input_schema") {
            Some(schema) if !is_empty(schema) => schema.clone(),
            _ => {
                return Err(UdfError::malformed_blob(
                    blob_id,
                    "must contain a non-empty 'input_schema' field",
                ));
            }
        };

        let function_name = match record.get("function_name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => {
                return Err(UdfError::malformed_blob(
                    blob_id,
                    "'function_name' must be a string",
                ));
            }
        };

        Ok(Self {
            code,
            input_schema,
            function_name,
        })
    }
}

/// Empty-value check for required blob fields: an absent, null, false,
/// zero, or empty value all count as missing.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
