//! Integration tests for udf-runtime-core.
//!
//! These tests verify the complete execution pipeline:
//! - Blob retrieval, compilation, and caching
//! - Signature adaptation across all eight call shapes
//! - Schema validation ordering
//! - Attribute-style input access
//! - Bare-body expression and statement modes

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pyo3::prelude::*;
use pyo3::types::PyDict;
use serde_json::{Value, json};

use udf_runtime_common::{RuntimeConfig, UdfError};
use udf_runtime_core::{BlobStore, CompiledUdf, UdfEngine, UdfRequest};

/// In-memory blob store that counts fetches.
struct MemoryStore {
    blobs: Value,
    fetches: AtomicUsize,
}

impl MemoryStore {
    fn new(blobs: Value) -> Self {
        Self {
            blobs,
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryStore {
    async fn get_blob(&self, blob_id: &str) -> anyhow::Result<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .get(blob_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such blob: {blob_id}"))
    }
}

fn blob(code: &str, function_name: Option<&str>) -> Value {
    let mut record = json!({
        "code": code,
        "input_schema": {"type": "object"},
    });
    if let Some(name) = function_name {
        record["function_name"] = json!(name);
    }
    record
}

/// A context object with a sentinel `value` attribute.
fn sentinel_context() -> Py<PyAny> {
    Python::with_gil(|py| {
        let kwargs = PyDict::new(py);
        kwargs.set_item("value", 42).unwrap();
        py.import("types")
            .unwrap()
            .getattr("SimpleNamespace")
            .unwrap()
            .call((), Some(&kwargs))
            .unwrap()
            .unbind()
    })
}

// ============================================================================
// Test: Signature Adaptation (all eight call shapes)
// ============================================================================

#[tokio::test]
async fn test_all_eight_call_shapes() {
    // (blob id, code, expected result for input {"x": 5} and context 42)
    let shapes = [
        ("sync-view", "def f(input): return input.x", json!(5)),
        (
            "sync-view-ctx",
            "def f(input, context): return input.x + context.value",
            json!(47),
        ),
        (
            "sync-raw",
            "def f(input: str): return input['x'] * 3",
            json!(15),
        ),
        (
            "sync-raw-ctx",
            "def f(input: str, context): return input['x'] + context.value",
            json!(47),
        ),
        ("async-view", "async def f(input): return input.x", json!(5)),
        (
            "async-view-ctx",
            "async def f(input, context): return context.value",
            json!(42),
        ),
        (
            "async-raw",
            "async def f(input: str): return input['x'] - 1",
            json!(4),
        ),
        (
            "async-raw-ctx",
            "async def f(input: str, context): return [input['x'], context.value]",
            json!([5, 42]),
        ),
    ];

    let mut blobs = serde_json::Map::new();
    for (blob_id, code, _) in &shapes {
        blobs.insert((*blob_id).to_string(), blob(code, Some("f")));
    }
    let engine = UdfEngine::new(Arc::new(MemoryStore::new(Value::Object(blobs))));
    let context = sentinel_context();

    for (blob_id, _, expected) in &shapes {
        let result = engine
            .execute(blob_id, &json!({"x": 5}), &context)
            .await
            .unwrap_or_else(|e| panic!("shape '{blob_id}' failed: {e}"));
        assert_eq!(result, *expected, "shape '{blob_id}'");
    }
}

#[tokio::test]
async fn test_raw_input_has_no_attribute_access() {
    let store = MemoryStore::new(json!({
        "raw": blob("def f(input: str): return input.x", Some("f")),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let err = engine
        .execute("raw", &json!({"x": 5}), &context)
        .await
        .unwrap_err();
    assert!(matches!(err, UdfError::Execution { .. }));
    assert!(err.to_string().contains("AttributeError"), "got: {err}");
}

// ============================================================================
// Test: Bare-Body Modes
// ============================================================================

#[tokio::test]
async fn test_bare_expression_mode() {
    let store = MemoryStore::new(json!({
        "expr": blob("input.x + 1", None),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let result = engine
        .execute("expr", &json!({"x": 1}), &context)
        .await
        .unwrap();
    assert_eq!(result, json!(2));
}

#[tokio::test]
async fn test_bare_statement_fallback() {
    let store = MemoryStore::new(json!({
        "stmt": blob("return input.x * 2", None),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let result = engine
        .execute("stmt", &json!({"x": 3}), &context)
        .await
        .unwrap();
    assert_eq!(result, json!(6));
}

#[tokio::test]
async fn test_bare_statement_receives_context() {
    let store = MemoryStore::new(json!({
        "ctx": blob("return context.value", None),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let result = engine.execute("ctx", &json!({}), &context).await.unwrap();
    assert_eq!(result, json!(42));
}

#[tokio::test]
async fn test_bare_multiline_statements() {
    let store = MemoryStore::new(json!({
        "multi": blob("y = input.x + 1\nreturn y * 10", None),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let result = engine
        .execute("multi", &json!({"x": 2}), &context)
        .await
        .unwrap();
    assert_eq!(result, json!(30));
}

// ============================================================================
// Test: Validation Ordering
// ============================================================================

#[tokio::test]
async fn test_validation_precedes_execution() {
    // The function raises unconditionally; if validation runs first, the
    // body never gets the chance.
    let store = MemoryStore::new(json!({
        "guarded": {
            "code": "def f(input): raise RuntimeError('user code ran')",
            "input_schema": {
                "type": "object",
                "properties": {"x": {"type": "integer"}},
                "required": ["x"],
            },
            "function_name": "f",
        },
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let err = engine.execute("guarded", &json!({}), &context).await.unwrap_err();
    assert!(matches!(err, UdfError::InputValidation { .. }), "got: {err}");
    assert!(!err.to_string().contains("user code ran"));
}

// ============================================================================
// Test: Attribute View Through Execution
// ============================================================================

#[tokio::test]
async fn test_nested_attribute_access() {
    let store = MemoryStore::new(json!({
        "nested": blob("def f(input): return input.user.name", Some("f")),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let result = engine
        .execute("nested", &json!({"user": {"name": "ada"}}), &context)
        .await
        .unwrap();
    assert_eq!(result, json!("ada"));
}

#[tokio::test]
async fn test_missing_field_maps_to_input_attribute_error() {
    let store = MemoryStore::new(json!({
        "missing": blob("def f(input): return input.absent", Some("f")),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let err = engine
        .execute("missing", &json!({"x": 1}), &context)
        .await
        .unwrap_err();
    assert!(matches!(err, UdfError::InputAttribute { .. }), "got: {err}");
    assert!(err.to_string().contains("absent"));
}

// ============================================================================
// Test: Restricted Environment
// ============================================================================

#[tokio::test]
async fn test_disallowed_builtin_unavailable_at_runtime() {
    let store = MemoryStore::new(json!({
        "escape": blob("def f(input): return open('/tmp/x')", Some("f")),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let err = engine
        .execute("escape", &json!({}), &context)
        .await
        .unwrap_err();
    assert!(matches!(err, UdfError::Execution { .. }));
    assert!(err.to_string().contains("NameError"), "got: {err}");
}

#[tokio::test]
async fn test_allowed_module_usable() {
    let store = MemoryStore::new(json!({
        "sqrt": blob("def f(input): return math.sqrt(input.x)", Some("f")),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let result = engine
        .execute("sqrt", &json!({"x": 9}), &context)
        .await
        .unwrap();
    assert_eq!(result, json!(3.0));
}

// ============================================================================
// Test: Execution Errors and Results
// ============================================================================

#[tokio::test]
async fn test_user_exception_maps_to_execution_error() {
    let store = MemoryStore::new(json!({
        "div": blob("def f(input): return 1 / 0", Some("f")),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let err = engine.execute("div", &json!({}), &context).await.unwrap_err();
    assert!(matches!(err, UdfError::Execution { .. }));
    assert!(err.to_string().contains("ZeroDivisionError"), "got: {err}");
}

#[tokio::test]
async fn test_unrepresentable_result_is_execution_error() {
    let store = MemoryStore::new(json!({
        "set": blob("def f(input): return {1, 2}", Some("f")),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let err = engine.execute("set", &json!({}), &context).await.unwrap_err();
    assert!(matches!(err, UdfError::Execution { .. }));
}

#[tokio::test]
async fn test_result_depth_limit_configurable() {
    let store = MemoryStore::new(json!({
        "deep": blob("def f(input): return {'a': {'b': {'c': 1}}}", Some("f")),
    }));
    let mut config = RuntimeConfig::default();
    config.execution.max_result_depth = 2;
    let engine = UdfEngine::with_config(Arc::new(store), config);
    let context = sentinel_context();

    let err = engine.execute("deep", &json!({}), &context).await.unwrap_err();
    assert!(matches!(err, UdfError::Execution { .. }));
}

// ============================================================================
// Test: Caching and Idempotence
// ============================================================================

#[tokio::test]
async fn test_compiled_once_across_invocations() {
    let store = Arc::new(MemoryStore::new(json!({
        "inc": blob("input.x + 1", None),
    })));
    let engine = UdfEngine::new(Arc::clone(&store) as Arc<dyn BlobStore>);
    let context = sentinel_context();

    for x in 0..5 {
        let result = engine
            .execute("inc", &json!({"x": x}), &context)
            .await
            .unwrap();
        assert_eq!(result, json!(x + 1));
    }

    assert_eq!(store.fetch_count(), 1);
    assert_eq!(engine.cache().len(), 1);
}

#[tokio::test]
async fn test_concurrent_invocations() {
    let store = Arc::new(MemoryStore::new(json!({
        "inc": blob("input.x + 1", None),
    })));
    let engine = Arc::new(UdfEngine::new(Arc::clone(&store) as Arc<dyn BlobStore>));
    let context = sentinel_context();

    let in1 = json!({"x": 1});
    let in2 = json!({"x": 2});
    let in3 = json!({"x": 3});
    let (a, b, c) = tokio::join!(
        engine.execute("inc", &in1, &context),
        engine.execute("inc", &in2, &context),
        engine.execute("inc", &in3, &context),
    );

    assert_eq!(a.unwrap(), json!(2));
    assert_eq!(b.unwrap(), json!(3));
    assert_eq!(c.unwrap(), json!(4));
    assert_eq!(engine.cache().len(), 1);
}

#[tokio::test]
async fn test_recompilation_is_idempotent() {
    // Two independent compiles of the same triple (simulating a first-miss
    // race) must be behaviorally indistinguishable.
    let code = "def f(input): return input.x * 2";
    let schema = json!({"type": "object"});
    let execution = RuntimeConfig::default().execution;
    let context = sentinel_context();

    let first = CompiledUdf::compile(code, Some("f"), &schema).unwrap();
    let second = CompiledUdf::compile(code, Some("f"), &schema).unwrap();

    let input = json!({"x": 21});
    let a = first.invoke(&input, &context, &execution).await.unwrap();
    let b = second.invoke(&input, &context, &execution).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a, json!(42));
    assert_eq!(first.shape(), second.shape());
}

// ============================================================================
// Test: Request Shape
// ============================================================================

#[tokio::test]
async fn test_execute_request_round_trip() {
    let store = MemoryStore::new(json!({
        "greet": blob("def f(input): return 'hello ' + input.name", Some("f")),
    }));
    let engine = UdfEngine::new(Arc::new(store));
    let context = sentinel_context();

    let request: UdfRequest =
        serde_json::from_value(json!({"blob_id": "greet", "input": {"name": "ada"}})).unwrap();
    let result = engine.execute_request(&request, &context).await.unwrap();
    assert_eq!(result, json!("hello ada"));
}
