//! Core execution engine for udf-runtime.
//!
//! This crate compiles and runs user-defined functions fetched from blob
//! storage:
//! - [`UdfEngine`]: Asynchronous entry point, one per host process
//! - [`FunctionCache`]: Blob-keyed cache of compiled functions
//! - [`CompiledUdf`]: A compiled function normalized to one calling
//!   convention
//! - [`InputView`]: Read-only attribute-style view over invocation input
//! - [`SchemaValidator`]: Input schema validation, always before user code
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      UdfEngine                          │
//! │  (Shared across all invocations, thread-safe)           │
//! │  - Blob store collaborator                              │
//! │  - Configuration                                        │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    FunctionCache                        │
//! │  (blob_id -> CompiledUdf, compiled at most once)        │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                     CompiledUdf                         │
//! │  (Per-invocation: validate, adapt arguments, execute)   │
//! │  - CallShape resolved once at compile time              │
//! │  - Restricted evaluation environment                    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod blob;
pub mod cache;
pub mod compiler;
pub mod engine;
pub mod environment;
pub mod input_view;
pub mod schema;
pub mod value;

pub use blob::{BlobRecord, BlobStore, UdfRequest};
pub use cache::FunctionCache;
pub use compiler::{CallShape, CompiledUdf};
pub use engine::UdfEngine;
pub use input_view::{InputAttributeError, InputView};
pub use schema::SchemaValidator;
