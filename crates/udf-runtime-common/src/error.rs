//! Error types for the udf-runtime.
//!
//! This module defines the engine's error taxonomy using `thiserror`. Every
//! failure mode of loading, compiling, validating, and executing a
//! user-defined function maps to exactly one [`UdfError`] variant, so the
//! host can surface the kind and cause without string matching.

use thiserror::Error;

/// Errors raised while loading, compiling, or executing a user-defined
/// function.
///
/// These are surfaced to the caller as-is — never swallowed and never
/// retried. Retry policy, if any, belongs to the host.
#[derive(Error, Debug)]
pub enum UdfError {
    /// The blob store failed to return the record for a blob id.
    ///
    /// Retrieval failures are never cached; a later call with the same
    /// blob id retries the fetch from scratch.
    #[error("failed to retrieve blob {blob_id}: {cause}")]
    BlobRetrieval {
        /// The blob id that could not be fetched.
        blob_id: String,
        /// The underlying store failure.
        cause: anyhow::Error,
    },

    /// The fetched blob record is missing a required field or is not a
    /// mapping at all.
    #[error("blob {blob_id} is malformed: {reason}")]
    MalformedBlob {
        /// The blob id whose record was rejected.
        blob_id: String,
        /// Which requirement was violated, naming the offending field.
        reason: String,
    },

    /// Executing or parsing the user's source code failed.
    #[error("compilation failed: {reason}")]
    Compilation {
        /// Description of the compilation failure.
        reason: String,
    },

    /// The code executed cleanly but does not define the requested function.
    #[error("function '{function_name}' not found in code")]
    FunctionNotFound {
        /// The name that was looked up.
        function_name: String,
    },

    /// The requested name resolved to something that cannot be called.
    #[error("'{function_name}' is not a function")]
    NotCallable {
        /// The name that resolved to a non-callable.
        function_name: String,
    },

    /// The declared input schema is itself structurally invalid.
    #[error("invalid input schema: {message}")]
    Schema {
        /// Description of the schema error.
        message: String,
    },

    /// The invocation input violates the declared input schema.
    ///
    /// Raised before any user code runs; the compiled function stays
    /// usable for future, valid inputs.
    #[error("input validation failed: {message}")]
    InputValidation {
        /// The underlying validator's message, including the instance path.
        message: String,
    },

    /// User code accessed a field the input does not have.
    #[error("{message}")]
    InputAttribute {
        /// Message identifying the missing field by its full dotted path.
        message: String,
    },

    /// User code raised during the actual call.
    #[error("function execution failed: {message}")]
    Execution {
        /// The exception type and message raised by user code.
        message: String,
    },
}

impl UdfError {
    /// Create a new `BlobRetrieval` error.
    pub fn blob_retrieval(blob_id: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::BlobRetrieval {
            blob_id: blob_id.into(),
            cause,
        }
    }

    /// Create a new `MalformedBlob` error.
    pub fn malformed_blob(blob_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedBlob {
            blob_id: blob_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `Compilation` error.
    pub fn compilation(reason: impl Into<String>) -> Self {
        Self::Compilation {
            reason: reason.into(),
        }
    }

    /// Create a new `FunctionNotFound` error.
    pub fn function_not_found(function_name: impl Into<String>) -> Self {
        Self::FunctionNotFound {
            function_name: function_name.into(),
        }
    }

    /// Create a new `NotCallable` error.
    pub fn not_callable(function_name: impl Into<String>) -> Self {
        Self::NotCallable {
            function_name: function_name.into(),
        }
    }

    /// Create a new `Schema` error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a new `InputValidation` error.
    pub fn input_validation(message: impl Into<String>) -> Self {
        Self::InputValidation {
            message: message.into(),
        }
    }

    /// Create a new `InputAttribute` error.
    pub fn input_attribute(message: impl Into<String>) -> Self {
        Self::InputAttribute {
            message: message.into(),
        }
    }

    /// Create a new `Execution` error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Returns `true` if this error occurred before the user function was
    /// resolved into a cached entry (fetch, record shape, or compilation).
    pub fn is_compilation(&self) -> bool {
        matches!(
            self,
            Self::BlobRetrieval { .. }
                | Self::MalformedBlob { .. }
                | Self::Compilation { .. }
                | Self::FunctionNotFound { .. }
                | Self::NotCallable { .. }
        )
    }

    /// Returns `true` if this error indicates bad invocation input rather
    /// than bad code.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Schema { .. } | Self::InputValidation { .. } | Self::InputAttribute { .. }
        )
    }

    /// Returns `true` if user code raised during the actual call.
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}
