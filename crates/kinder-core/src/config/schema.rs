//! JSON Schema validation for aggregation configs.
//!
//! Configs are checked structurally against `schema/aggregation.schema.json`
//! before deserialization so every violation is reported at once, each
//! prefixed by the JSON pointer of the offending value.

use jsonschema::{ValidationError, Validator};
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

const AGGREGATION_SCHEMA: &str = include_str!("../../schema/aggregation.schema.json");

static VALIDATOR: LazyLock<Result<Validator, SchemaError>> = LazyLock::new(compile);

/// The embedded schema itself is broken.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    #[error("Config schema is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Config schema does not compile: {0}")]
    Compile(String),
}

fn compile() -> Result<Validator, SchemaError> {
    let schema: Value = serde_json::from_str(AGGREGATION_SCHEMA)
        .map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
    jsonschema::validator_for(&schema).map_err(|e| SchemaError::Compile(e.to_string()))
}

/// Check a config document against the schema.
///
/// Each violation reads `"<pointer>: <message>"`; violations on the
/// document itself use `(root)` as the pointer.
pub fn validate_config_schema(config: &Value) -> Result<(), Vec<String>> {
    let validator = VALIDATOR.as_ref().map_err(|e| vec![e.to_string()])?;

    let violations: Vec<String> = validator.iter_errors(config).map(describe).collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn describe(error: ValidationError<'_>) -> String {
    let pointer = error.instance_path.to_string();
    if pointer.is_empty() {
        format!("(root): {}", error)
    } else {
        format!("{}: {}", pointer, error)
    }
}
