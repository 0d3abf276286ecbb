//! Conversion of raw string parameter values to their declared types.
//!
//! Path segments, query values, headers, and form fields all arrive as
//! strings. Before they are checked against a JSON Schema they are converted
//! according to the schema's `type`:
//!
//! | Schema type | Accepted input | Result |
//! |---|---|---|
//! | `integer` | `-12` | JSON integer |
//! | `number` | `1.5`, `3` | JSON number |
//! | `boolean` | `true`, `false` | JSON boolean |
//! | `array` | `a,b` or repeated keys | JSON array, items coerced |
//! | `string` and anything else | any | unchanged |
//!
//! `anyOf`/`oneOf` schemas without a `type` try each alternative in turn.

use serde_json::{Number, Value};

use crate::operation::{ParameterSpec, ParameterStyle};

/// A value that cannot be converted to its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionFailure {
    /// The declared type, e.g. `integer`.
    pub expected: String,
}

/// Returns the primary `type` of a schema.
///
/// For a type list (`["integer", "null"]`) the first non-null entry wins.
pub fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn nullable(schema: &Value) -> bool {
    schema.get("nullable").and_then(Value::as_bool) == Some(true)
        || matches!(schema.get("type"), Some(Value::Array(types)) if types.iter().any(|t| t == "null"))
}

/// Converts a single string to the scalar type `schema` declares.
pub fn coerce_str(raw: &str, schema: &Value) -> Result<Value, CoercionFailure> {
    let failure = |expected: &str| CoercionFailure {
        expected: expected.to_string(),
    };

    if raw.is_empty() && nullable(schema) {
        return Ok(Value::Null);
    }

    match schema_type(schema) {
        Some("integer") => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| failure("integer")),
        Some("number") => {
            if let Ok(int) = raw.parse::<i64>() {
                return Ok(Value::from(int));
            }
            raw.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| failure("number"))
        }
        Some("boolean") => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(failure("boolean")),
        },
        Some("null") if raw.is_empty() => Ok(Value::Null),
        Some("null") => Err(failure("null")),
        Some("array") => coerce_array(vec![Value::String(raw.to_string())], schema, ',', false),
        Some(_) => Ok(Value::String(raw.to_string())),
        None => coerce_alternatives(&Value::String(raw.to_string()), schema),
    }
}

fn coerce_alternatives(value: &Value, schema: &Value) -> Result<Value, CoercionFailure> {
    let alternatives = schema
        .get("anyOf")
        .or_else(|| schema.get("oneOf"))
        .and_then(Value::as_array);

    let Some(alternatives) = alternatives else {
        return Ok(value.clone());
    };

    for alternative in alternatives {
        if let Ok(coerced) = coerce_value(value, alternative, ParameterStyle::Form, true) {
            if coerced != *value {
                return Ok(coerced);
            }
        }
    }
    Ok(value.clone())
}

fn coerce_array(
    items: Vec<Value>,
    schema: &Value,
    separator: char,
    exploded: bool,
) -> Result<Value, CoercionFailure> {
    let item_schema = schema.get("items").cloned().unwrap_or(Value::Null);

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(raw) if !exploded => {
                for part in raw.split(separator) {
                    out.push(coerce_item(part, &item_schema)?);
                }
            }
            Value::String(raw) => out.push(coerce_item(&raw, &item_schema)?),
            other => out.push(other),
        }
    }
    Ok(Value::Array(out))
}

fn coerce_item(raw: &str, item_schema: &Value) -> Result<Value, CoercionFailure> {
    if item_schema.is_null() {
        return Ok(Value::String(raw.to_string()));
    }
    coerce_str(raw, item_schema).map_err(|f| CoercionFailure {
        expected: format!("array of {}", f.expected),
    })
}

/// Converts an unpacked value to the type `schema` declares.
///
/// Already-typed values (numbers, objects from a JSON body) pass through.
/// Strings are split into arrays using the style's separator unless the
/// parameter is exploded form style, in which case each repeated key is
/// already its own array element.
pub fn coerce_value(
    value: &Value,
    schema: &Value,
    style: ParameterStyle,
    explode: bool,
) -> Result<Value, CoercionFailure> {
    let exploded = explode && style == ParameterStyle::Form;
    match (value, schema_type(schema)) {
        (Value::String(raw), Some("array")) => {
            coerce_array(vec![Value::String(raw.clone())], schema, style.separator(), exploded)
        }
        (Value::Array(items), Some("array")) => {
            coerce_array(items.clone(), schema, style.separator(), exploded)
        }
        (Value::String(raw), Some(_)) => coerce_str(raw, schema),
        (Value::String(_) | Value::Array(_), None) => coerce_alternatives(value, schema),
        _ => Ok(value.clone()),
    }
}

/// Converts a value for a declared parameter.
pub fn coerce_parameter(value: &Value, spec: &ParameterSpec) -> Result<Value, CoercionFailure> {
    coerce_value(value, &spec.schema, spec.style, spec.explode)
}
