//! Attribute-style input view over invocation data.
//!
//! [`InputView`] is the read-only object handed to user functions that
//! expect ergonomic field access: `input.user.name` and
//! `input["user"]["name"]` are equivalent. Nested mappings are wrapped
//! lazily — a child view is only materialized when the field is accessed —
//! and the view tracks its access path so a missing field is reported with
//! its full dotted location.
//!
//! Views never mutate the underlying data and expose no write operations.
//! A fresh view is constructed for every invocation.

use std::sync::Arc;

use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;
use serde_json::Value;

use crate::value::json_to_py;

create_exception!(
    udf_runtime,
    InputAttributeError,
    PyException,
    "Raised when user code accesses an input field that does not exist."
);

/// Read-only recursive view over a JSON object, with attribute-style access.
#[pyclass(frozen, name = "InputView", module = "udf_runtime")]
#[derive(Clone)]
pub struct InputView {
    root: Arc<Value>,
    path: Vec<String>,
}

impl InputView {
    /// Create a view over the root of `data`.
    ///
    /// The value is expected to be a JSON object; anything else yields a
    /// view with no fields.
    pub fn new(data: Arc<Value>) -> Self {
        Self {
            root: data,
            path: Vec::new(),
        }
    }

    /// Resolve this view's node by walking the access path from the root.
    ///
    /// Child views are only created for keys that held an object, so the
    /// walk fails only if the underlying data changed — which it cannot,
    /// the root is immutable.
    fn fields(&self) -> Option<&serde_json::Map<String, Value>> {
        let mut node: &Value = &self.root;
        for segment in &self.path {
            node = node.as_object()?.get(segment)?;
        }
        node.as_object()
    }

    /// The dotted path of `key` relative to the input root.
    fn dotted(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path.join("."), key)
        }
    }

    fn lookup(&self, py: Python<'_>, key: &str) -> PyResult<Py<PyAny>> {
        match self.fields().and_then(|map| map.get(key)) {
            Some(Value::Object(_)) => {
                let mut path = self.path.clone();
                path.push(key.to_string());
                let child = Self {
                    root: Arc::clone(&self.root),
                    path,
                };
                Ok(Py::new(py, child)?.into_any())
            }
            Some(value) => json_to_py(py, value),
            None => Err(InputAttributeError::new_err(format!(
                "input has no field '{}'",
                self.dotted(key)
            ))),
        }
    }

    /// A clone of the JSON value this view currently points at.
    ///
    /// Used when user code returns the view (or a sub-view) as its result.
    pub(crate) fn snapshot(&self) -> Value {
        let mut node: &Value = &self.root;
        for segment in &self.path {
            match node.as_object().and_then(|map| map.get(segment)) {
                Some(child) => node = child,
                None => return Value::Null,
            }
        }
        node.clone()
    }
}

#[pymethods]
impl InputView {
    fn __getattr__(&self, py: Python<'_>, name: &str) -> PyResult<Py<PyAny>> {
        self.lookup(py, name)
    }

    fn __getitem__(&self, py: Python<'_>, key: &str) -> PyResult<Py<PyAny>> {
        self.lookup(py, key)
    }

    fn __contains__(&self, key: &str) -> bool {
        self.fields().is_some_and(|map| map.contains_key(key))
    }

    fn __len__(&self) -> usize {
        self.fields().map_or(0, serde_json::Map::len)
    }

    /// Field names of this view, in document order.
    fn keys(&self) -> Vec<String> {
        self.fields()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn __repr__(&self) -> String {
        if self.path.is_empty() {
            "InputView(input)".to_string()
        } else {
            format!("InputView(input.{})", self.path.join("."))
        }
    }
}
