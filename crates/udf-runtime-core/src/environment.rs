//! Restricted evaluation environment for user code.
//!
//! User-authored functions compile and run against a namespace built from a
//! fixed allow-list of builtin names plus a small fixed set of standard
//! modules. The allow-lists are constants; there is no per-call
//! customization. This is a best-effort reduction of surface area, not a
//! security boundary — `__import__` and `getattr` remain reachable.

use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Builtin names available to user code.
pub const ALLOWED_BUILTINS: &[&str] = &[
    "len",
    "str",
    "int",
    "float",
    "bool",
    "list",
    "dict",
    "tuple",
    "set",
    "range",
    "sum",
    "min",
    "max",
    "abs",
    "round",
    "sorted",
    "reversed",
    "enumerate",
    "zip",
    "map",
    "filter",
    "any",
    "all",
    "print",
    "isinstance",
    "__import__",
    "getattr",
];

/// Standard modules pre-imported into the user namespace.
pub const ALLOWED_MODULES: &[&str] = &["json", "math", "re"];

/// Build the globals dict for compiling and evaluating user code.
///
/// Each compilation gets its own dict so top-level assignments in one blob's
/// code cannot leak into another's `__globals__`; the symbol set itself is
/// always the same.
pub fn restricted_globals(py: Python<'_>) -> PyResult<Bound<'_, PyDict>> {
    let builtins = py.import("builtins")?;

    let allowed = PyDict::new(py);
    for name in ALLOWED_BUILTINS {
        allowed.set_item(*name, builtins.getattr(*name)?)?;
    }

    let globals = PyDict::new(py);
    globals.set_item("__builtins__", allowed)?;
    for module in ALLOWED_MODULES {
        globals.set_item(*module, py.import(*module)?)?;
    }

    Ok(globals)
}
