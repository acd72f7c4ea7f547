//! Conversion between JSON values and guest objects.
//!
//! Invocation inputs cross into the interpreter as plain dicts (or stay on
//! the Rust side entirely when wrapped in an
//! [`InputView`](crate::input_view::InputView)); results cross back out as
//! JSON. Conversion back is depth-guarded because user code can return
//! arbitrarily nested or cyclic object graphs.

use pyo3::exceptions::{PyRecursionError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyString, PyTuple};
use serde_json::Value;

use crate::input_view::InputView;

/// Convert a JSON value into the equivalent guest object.
pub fn json_to_py(py: Python<'_>, value: &Value) -> PyResult<Py<PyAny>> {
    let object = match value {
        Value::Null => py.None(),
        Value::Bool(flag) => PyBool::new(py, *flag).to_owned().into_any().unbind(),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                int.into_pyobject(py)?.into_any().unbind()
            } else if let Some(int) = number.as_u64() {
                int.into_pyobject(py)?.into_any().unbind()
            } else {
                number
                    .as_f64()
                    .unwrap_or(f64::NAN)
                    .into_pyobject(py)?
                    .into_any()
                    .unbind()
            }
        }
        Value::String(text) => PyString::new(py, text).into_any().unbind(),
        Value::Array(items) => {
            let list = PyList::empty(py);
            for item in items {
                list.append(json_to_py(py, item)?)?;
            }
            list.into_any().unbind()
        }
        Value::Object(map) => {
            let dict = PyDict::new(py);
            for (key, item) in map {
                dict.set_item(key, json_to_py(py, item)?)?;
            }
            dict.into_any().unbind()
        }
    };
    Ok(object)
}

/// Convert a guest object back into JSON.
///
/// Supports the JSON-shaped subset of guest objects: `None`, booleans,
/// ints, floats, strings, lists, tuples, string-keyed dicts, and input
/// views (which resolve to the data they wrap). Anything else — and any
/// graph nested deeper than `max_depth` — is rejected.
pub fn py_to_json(value: &Bound<'_, PyAny>, max_depth: u32) -> PyResult<Value> {
    if max_depth == 0 {
        return Err(PyRecursionError::new_err(
            "result nesting exceeds the maximum depth",
        ));
    }

    if value.is_none() {
        return Ok(Value::Null);
    }
    // bool is a subclass of int; check it first
    if let Ok(flag) = value.downcast::<PyBool>() {
        return Ok(Value::Bool(flag.is_true()));
    }
    if let Ok(view) = value.downcast::<InputView>() {
        return Ok(view.get().snapshot());
    }
    if value.downcast::<PyInt>().is_ok() {
        if let Ok(int) = value.extract::<i64>() {
            return Ok(Value::from(int));
        }
        if let Ok(int) = value.extract::<u64>() {
            return Ok(Value::from(int));
        }
        return Err(PyValueError::new_err(
            "integer result is outside the JSON range",
        ));
    }
    if let Ok(float) = value.downcast::<PyFloat>() {
        return serde_json::Number::from_f64(float.value())
            .map(Value::Number)
            .ok_or_else(|| {
                PyValueError::new_err("non-finite float result is not JSON-representable")
            });
    }
    if let Ok(text) = value.downcast::<PyString>() {
        return Ok(Value::String(text.extract()?));
    }
    if let Ok(list) = value.downcast::<PyList>() {
        let mut items = Vec::with_capacity(list.len());
        for item in list.iter() {
            items.push(py_to_json(&item, max_depth - 1)?);
        }
        return Ok(Value::Array(items));
    }
    if let Ok(tuple) = value.downcast::<PyTuple>() {
        let mut items = Vec::with_capacity(tuple.len());
        for item in tuple.iter() {
            items.push(py_to_json(&item, max_depth - 1)?);
        }
        return Ok(Value::Array(items));
    }
    if let Ok(dict) = value.downcast::<PyDict>() {
        let mut map = serde_json::Map::new();
        for (key, item) in dict.iter() {
            let key: String = key
                .extract()
                .map_err(|_| PyTypeError::new_err("result mapping keys must be strings"))?;
            map.insert(key, py_to_json(&item, max_depth - 1)?);
        }
        return Ok(Value::Object(map));
    }

    let type_name = value
        .get_type()
        .name()
        .map_or_else(|_| "<unknown>".to_string(), |name| name.to_string());
    Err(PyTypeError::new_err(format!(
        "result of type '{type_name}' is not JSON-representable"
    )))
}
