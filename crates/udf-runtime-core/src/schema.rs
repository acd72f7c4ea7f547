//! Input schema validation.
//!
//! Every compiled function carries a [`SchemaValidator`] built from the
//! blob's declared input schema. Validation runs synchronously before every
//! invocation, never after, so schema-violating input can never reach user
//! code.

use jsonschema::Validator;
use serde_json::Value;

use udf_runtime_common::UdfError;

/// Compiled JSON Schema validator for invocation input.
#[derive(Debug)]
pub struct SchemaValidator {
    validator: Validator,
}

impl SchemaValidator {
    /// Compile `schema` into a validator.
    ///
    /// # Errors
    ///
    /// Returns [`UdfError::Schema`] when the schema itself is structurally
    /// invalid.
    pub fn new(schema: &Value) -> Result<Self, UdfError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| UdfError::schema(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Validate `data` against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`UdfError::InputValidation`] carrying the underlying
    /// validator's message and the instance path of the failure.
    pub fn validate(&self, data: &Value) -> Result<(), UdfError> {
        self.validator.validate(data).map_err(|error| {
            let path = error.instance_path.to_string();
            let location = if path.is_empty() {
                "$".to_string()
            } else {
                format!("${path}")
            };
            UdfError::input_validation(format!("at '{location}': {error}"))
        })
    }
}
