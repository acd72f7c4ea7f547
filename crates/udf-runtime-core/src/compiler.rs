//! User-function compilation and signature adaptation.
//!
//! This module turns a blob's source code into a [`CompiledUdf`]: a cached,
//! immutable entry whose [`invoke`](CompiledUdf::invoke) method presents one
//! canonical calling convention — `(input_data, context) -> result` — no
//! matter how the author wrote their function.
//!
//! Authors get three independent degrees of freedom:
//! - synchronous or asynchronous definition,
//! - a bare `input` parameter or an `(input, context)` pair,
//! - attribute-style input access (unannotated or `dict`-annotated first
//!   parameter) or the plain mapping.
//!
//! The resulting eight call shapes are resolved once at compile time into a
//! [`CallShape`] and never re-inspected per call.

use std::ffi::CString;
use std::sync::Arc;

use pyo3::prelude::*;
use pyo3::types::PyDict;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::environment::restricted_globals;
use crate::input_view::{InputAttributeError, InputView};
use crate::schema::SchemaValidator;
use crate::value::{json_to_py, py_to_json};
use udf_runtime_common::{ExecutionConfig, UdfError};

/// Name under which a bare statement body is compiled.
const BODY_FUNCTION: &str = "_udf_body";

/// How a user function expects to be called.
///
/// Resolved once per compiled entry by introspecting the function's
/// declared parameters; documents every supported author contract as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallShape {
    /// Invoking the function returns a coroutine that must be driven.
    pub is_async: bool,
    /// The first parameter is unannotated or annotated as a plain `dict`,
    /// so the author expects attribute-style access on the input.
    pub wants_input_view: bool,
    /// There is a second parameter literally named `context`.
    pub wants_context: bool,
}

/// A compiled user function with validation built in.
///
/// Immutable once created; owned by the cache behind an `Arc` and shared
/// across invocations. Compilation is a pure function of
/// `(code, function_name, input_schema)`, so compiling the same triple
/// twice yields behaviorally indistinguishable entries.
pub struct CompiledUdf {
    function: Py<PyAny>,
    shape: CallShape,
    validator: SchemaValidator,
    function_name: Option<String>,
}

impl CompiledUdf {
    /// Compile user source code into an invocable entry.
    ///
    /// With a `function_name`, the code is executed in the restricted
    /// environment and the named function is resolved and introspected.
    /// Without one, the code is treated as a bare function body: first as a
    /// single expression over `input`, then — if that fails — as a
    /// statement sequence re-indented under a synthesized
    /// `(input, context)` definition.
    ///
    /// # Errors
    ///
    /// - [`UdfError::Schema`] when `input_schema` does not compile
    /// - [`UdfError::Compilation`] when executing or parsing the code fails
    /// - [`UdfError::FunctionNotFound`] when the named function is absent
    /// - [`UdfError::NotCallable`] when the name resolves to a non-callable
    #[instrument(skip(code, input_schema))]
    pub fn compile(
        code: &str,
        function_name: Option<&str>,
        input_schema: &Value,
    ) -> Result<Self, UdfError> {
        let validator = SchemaValidator::new(input_schema)?;

        Python::with_gil(|py| {
            let (function, shape) = match function_name {
                Some(name) => compile_named(py, code, name)?,
                None => compile_bare(py, code)?,
            };

            debug!(?shape, "user function compiled");

            Ok(Self {
                function,
                shape,
                validator,
                function_name: function_name.map(String::from),
            })
        })
    }

    /// Invoke the function with the canonical `(input_data, context)`
    /// contract.
    ///
    /// Input is validated against the declared schema before any user code
    /// runs. The input is then supplied as an [`InputView`] or a plain
    /// mapping, and `context` is forwarded only when the shape asks for it.
    /// The wrapper is awaitable regardless of the user function's
    /// synchrony; coroutines returned by async definitions are driven to
    /// completion before the result is converted back to JSON.
    ///
    /// # Errors
    ///
    /// - [`UdfError::InputValidation`] when `input` violates the schema
    /// - [`UdfError::InputAttribute`] when user code accessed a missing
    ///   input field
    /// - [`UdfError::Execution`] when user code raised, or when its result
    ///   is not JSON-representable
    pub async fn invoke(
        &self,
        input: &Value,
        context: &Py<PyAny>,
        execution: &ExecutionConfig,
    ) -> Result<Value, UdfError> {
        self.validator.validate(input)?;

        Python::with_gil(|py| self.call(py, input, context, execution))
    }

    /// The call shape resolved at compile time.
    pub fn shape(&self) -> CallShape {
        self.shape
    }

    /// The resolved function name, if the blob named one.
    pub fn function_name(&self) -> Option<&str> {
        self.function_name.as_deref()
    }

    fn call(
        &self,
        py: Python<'_>,
        input: &Value,
        context: &Py<PyAny>,
        execution: &ExecutionConfig,
    ) -> Result<Value, UdfError> {
        let function = self.function.bind(py);

        // The view is constructed fresh per call; it is never reused across
        // invocations.
        let argument: Py<PyAny> = if self.shape.wants_input_view {
            Py::new(py, InputView::new(Arc::new(input.clone())))
                .map_err(|e| UdfError::execution(e.to_string()))?
                .into_any()
        } else {
            json_to_py(py, input).map_err(|e| UdfError::execution(e.to_string()))?
        };

        let outcome = if self.shape.wants_context {
            function.call1((argument, context.bind(py)))
        } else {
            function.call1((argument,))
        };
        let result = outcome.map_err(|e| map_guest_error(py, &e))?;

        let result = if self.shape.is_async {
            let asyncio = py
                .import("asyncio")
                .map_err(|e| UdfError::execution(e.to_string()))?;
            asyncio
                .call_method1("run", (result,))
                .map_err(|e| map_guest_error(py, &e))?
        } else {
            result
        };

        py_to_json(&result, execution.max_result_depth)
            .map_err(|e| UdfError::execution(e.to_string()))
    }
}

impl std::fmt::Debug for CompiledUdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledUdf")
            .field("shape", &self.shape)
            .field("function_name", &self.function_name)
            .finish_non_exhaustive()
    }
}

/// Execute `code` and resolve `function_name` within it.
fn compile_named(
    py: Python<'_>,
    code: &str,
    function_name: &str,
) -> Result<(Py<PyAny>, CallShape), UdfError> {
    let globals = restricted_globals(py).map_err(|e| UdfError::compilation(e.to_string()))?;
    let locals = PyDict::new(py);

    let source = to_cstring(code)?;
    py.run(&source, Some(&globals), Some(&locals))
        .map_err(|e| UdfError::compilation(e.to_string()))?;

    let function = locals
        .get_item(function_name)
        .map_err(|e| UdfError::compilation(e.to_string()))?
        .ok_or_else(|| UdfError::function_not_found(function_name))?;
    if !function.is_callable() {
        return Err(UdfError::not_callable(function_name));
    }

    let shape = introspect_shape(py, &function)?;
    Ok((function.unbind(), shape))
}

/// Compile a bare function body: expression first, statement fallback.
fn compile_bare(py: Python<'_>, code: &str) -> Result<(Py<PyAny>, CallShape), UdfError> {
    let globals = restricted_globals(py).map_err(|e| UdfError::compilation(e.to_string()))?;

    // Expression attempt: bind the body to a single `input` parameter.
    if let Ok(source) = CString::new(format!("lambda input: {code}")) {
        if let Ok(function) = py.eval(&source, Some(&globals), None) {
            let shape = CallShape {
                is_async: false,
                wants_input_view: true,
                wants_context: false,
            };
            return Ok((function.unbind(), shape));
        }
    }

    // Statement fallback: re-indent the body under a synthesized
    // definition that also receives the context.
    let definition = format!("def {BODY_FUNCTION}(input, context):\n{}", reindent(code));
    let source = to_cstring(&definition)?;
    let locals = PyDict::new(py);
    py.run(&source, Some(&globals), Some(&locals))
        .map_err(|e| UdfError::compilation(e.to_string()))?;

    let function = locals
        .get_item(BODY_FUNCTION)
        .map_err(|e| UdfError::compilation(e.to_string()))?
        .ok_or_else(|| UdfError::compilation("synthesized body did not define a function"))?;

    let shape = CallShape {
        is_async: false,
        wants_input_view: true,
        wants_context: true,
    };
    Ok((function.unbind(), shape))
}

/// Resolve a function's [`CallShape`] from its declared parameters.
fn introspect_shape(py: Python<'_>, function: &Bound<'_, PyAny>) -> Result<CallShape, UdfError> {
    let shape = (|| -> PyResult<Option<CallShape>> {
        let inspect = py.import("inspect")?;

        let is_async = inspect
            .call_method1("iscoroutinefunction", (function,))?
            .extract::<bool>()?;

        let signature = inspect.call_method1("signature", (function,))?;
        let parameters: Vec<Bound<'_, PyAny>> = signature
            .getattr("parameters")?
            .call_method0("values")?
            .try_iter()?
            .collect::<PyResult<_>>()?;

        let Some(first) = parameters.first() else {
            return Ok(None);
        };

        // Attribute-style access is offered only when the author left the
        // first parameter unannotated or annotated it as a plain dict.
        let annotation = first.getattr("annotation")?;
        let empty = inspect.getattr("Parameter")?.getattr("empty")?;
        let dict_type = py.get_type::<PyDict>();
        let wants_input_view =
            annotation.as_ptr() == empty.as_ptr() || annotation.as_ptr() == dict_type.as_ptr();

        // The context is forwarded only to a second parameter literally
        // named `context`.
        let wants_context = parameters.len() == 2
            && parameters[1].getattr("name")?.extract::<String>()? == "context";

        Ok(Some(CallShape {
            is_async,
            wants_input_view,
            wants_context,
        }))
    })()
    .map_err(|e| UdfError::compilation(e.to_string()))?;

    shape.ok_or_else(|| UdfError::compilation("function must accept at least one parameter"))
}

/// Map an exception raised by user code into the engine's taxonomy.
fn map_guest_error(py: Python<'_>, error: &PyErr) -> UdfError {
    if error.is_instance_of::<InputAttributeError>(py) {
        UdfError::input_attribute(error.value(py).to_string())
    } else {
        UdfError::execution(error.to_string())
    }
}

fn to_cstring(code: &str) -> Result<CString, UdfError> {
    CString::new(code).map_err(|_| UdfError::compilation("code contains an interior NUL byte"))
}

/// Indent every non-empty line by four spaces, preserving blank lines.
fn reindent(code: &str) -> String {
    code.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
