//! OpenAPI 3 document loading.
//!
//! This module turns an OpenAPI document into a [`Contract`]: path-level
//! parameters are merged into each operation, local `$ref`s are inlined, and
//! OpenAPI 3.0 `nullable: true` is rewritten to a JSON Schema `anyOf`.

use std::path::Path;

use covenant_core::{
    Contract, Operation, ParameterLocation, ParameterSpec, ParameterStyle, RequestBodySpec,
    ResponseHeaderSpec, ResponseKey, ResponseSpec,
};
use http::Method;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::ContractError;

/// Reference and nesting depth past which schemas become permissive.
const MAX_DEPTH: usize = 50;

const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// JSON Schema dialect a document's schemas are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaDialect {
    /// OpenAPI 3.0: a draft 4 superset.
    #[default]
    Draft4,
    /// OpenAPI 3.1: JSON Schema 2020-12.
    Draft202012,
}

/// A parsed OpenAPI document.
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    raw: Value,
    dialect: SchemaDialect,
}

impl OpenApiDocument {
    /// Load a document from a file. `.yaml`/`.yml` files are parsed as YAML,
    /// everything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading contract from file");

        let content = std::fs::read_to_string(path).map_err(|source| ContractError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ContractError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ContractError> {
        Self::from_value(serde_yaml::from_str(yaml)?)
    }

    /// Wrap an already-parsed document.
    pub fn from_value(raw: Value) -> Result<Self, ContractError> {
        let version = raw
            .get("openapi")
            .and_then(Value::as_str)
            .ok_or_else(|| ContractError::MissingField {
                field: "/openapi".to_string(),
            })?;

        let dialect = if version.starts_with("3.0") {
            SchemaDialect::Draft4
        } else if version.starts_with("3.") {
            SchemaDialect::Draft202012
        } else {
            return Err(ContractError::Invalid {
                location: "/openapi".to_string(),
                reason: format!("unsupported OpenAPI version '{}'", version),
            });
        };

        Ok(Self { raw, dialect })
    }

    /// The schema dialect implied by the `openapi` version.
    pub fn dialect(&self) -> SchemaDialect {
        self.dialect
    }

    /// The raw document.
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    /// Build the contract described by this document.
    pub fn to_contract(&self) -> Result<Contract, ContractError> {
        let info = self.raw.get("info");
        let title = info
            .and_then(|i| i.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let version = info
            .and_then(|i| i.get("version"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut operations = Vec::new();
        if let Some(paths) = self.raw.get("paths").and_then(Value::as_object) {
            for (path, item) in paths {
                let item = self.resolve_refs(item.clone(), 0)?;
                self.collect_operations(path, &item, &mut operations)?;
            }
        }

        info!(
            title,
            version,
            operations = operations.len(),
            "contract loaded"
        );

        Ok(Contract::new(title, version, operations))
    }

    fn collect_operations(
        &self,
        path: &str,
        item: &Value,
        operations: &mut Vec<Operation>,
    ) -> Result<(), ContractError> {
        let location = format!("/paths/{}", escape_pointer(path));
        let shared = parse_parameters(item.get("parameters"), &location)?;

        for method_name in METHODS {
            let Some(op) = item.get(method_name) else {
                continue;
            };
            let op_location = format!("{}/{}", location, method_name);

            let method = Method::from_bytes(method_name.to_ascii_uppercase().as_bytes())
                .map_err(|e| ContractError::Invalid {
                    location: op_location.clone(),
                    reason: e.to_string(),
                })?;

            let id = op
                .get("operationId")
                .and_then(Value::as_str)
                .map_or_else(|| format!("{} {}", method, path), str::to_string);

            // Operation-level parameters override path-level ones
            let mut parameters = shared.clone();
            for param in parse_parameters(op.get("parameters"), &op_location)? {
                parameters.retain(|p| !(p.name == param.name && p.location == param.location));
                parameters.push(param);
            }

            let mut operation = Operation::new(id, method, path);
            operation.summary = op.get("summary").and_then(Value::as_str).map(str::to_string);
            operation.deprecated = op
                .get("deprecated")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            operation.parameters = parameters;
            operation.request_body = op.get("requestBody").map(parse_request_body);

            if let Some(responses) = op.get("responses").and_then(Value::as_object) {
                for (key, response) in responses {
                    match ResponseKey::parse(key) {
                        Some(key) => {
                            operation.responses.insert(key, parse_response(response));
                        }
                        None => warn!(
                            operation_id = %operation.id,
                            key,
                            "ignoring unrecognised response key"
                        ),
                    }
                }
            }

            debug!(
                operation_id = %operation.id,
                method = %operation.method,
                path,
                "operation loaded"
            );
            operations.push(operation);
        }

        Ok(())
    }

    /// Recursively inline local `$ref`s and rewrite `nullable`.
    ///
    /// References that do not start with `#/` are replaced by a permissive
    /// schema, as are references nested deeper than [`MAX_DEPTH`].
    fn resolve_refs(&self, mut value: Value, depth: usize) -> Result<Value, ContractError> {
        if depth > MAX_DEPTH {
            return Ok(json!({}));
        }

        match &mut value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    let target = self.resolve_ref(reference)?;
                    return self.resolve_refs(target, depth + 1);
                }

                if map.get("nullable").and_then(Value::as_bool) == Some(true) {
                    map.remove("nullable");
                    let non_null = self.resolve_refs(Value::Object(std::mem::take(map)), depth + 1)?;
                    return Ok(json!({ "anyOf": [non_null, { "type": "null" }] }));
                }

                let keys: Vec<String> = map.keys().cloned().collect();
                for key in keys {
                    if let Some(child) = map.remove(&key) {
                        let resolved = self.resolve_refs(child, depth + 1)?;
                        map.insert(key, resolved);
                    }
                }
                Ok(value)
            }
            Value::Array(items) => {
                let resolved: Result<Vec<Value>, ContractError> = items
                    .drain(..)
                    .map(|item| self.resolve_refs(item, depth + 1))
                    .collect();
                Ok(Value::Array(resolved?))
            }
            _ => Ok(value),
        }
    }

    fn resolve_ref(&self, reference: &str) -> Result<Value, ContractError> {
        let Some(pointer) = reference.strip_prefix('#') else {
            // External refs are not fetched
            return Ok(json!({}));
        };

        self.raw
            .pointer(pointer)
            .cloned()
            .ok_or_else(|| ContractError::UnresolvedRef {
                reference: reference.to_string(),
            })
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn parse_parameters(
    value: Option<&Value>,
    location: &str,
) -> Result<Vec<ParameterSpec>, ContractError> {
    let Some(list) = value.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let mut parameters = Vec::with_capacity(list.len());
    for (index, param) in list.iter().enumerate() {
        let param_location = format!("{}/parameters/{}", location, index);
        let invalid = |reason: &str| ContractError::Invalid {
            location: param_location.clone(),
            reason: reason.to_string(),
        };

        let name = param
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("parameter has no name"))?;
        let param_in = param
            .get("in")
            .and_then(Value::as_str)
            .and_then(ParameterLocation::parse)
            .ok_or_else(|| invalid("parameter has no valid 'in'"))?;

        // A parameter carries either `schema` or a single-entry `content` map
        let schema = param
            .get("schema")
            .cloned()
            .or_else(|| {
                param
                    .get("content")
                    .and_then(Value::as_object)
                    .and_then(|content| content.values().next())
                    .and_then(|media| media.get("schema"))
                    .cloned()
            })
            .unwrap_or_else(|| json!({}));

        let mut spec = ParameterSpec::new(name, param_in, schema).required(
            param
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        );

        let style = param
            .get("style")
            .and_then(Value::as_str)
            .and_then(ParameterStyle::parse)
            .unwrap_or(spec.style);
        let explode = param
            .get("explode")
            .and_then(Value::as_bool)
            .unwrap_or(style == ParameterStyle::Form);
        spec = spec.with_style(style, explode);

        parameters.push(spec);
    }
    Ok(parameters)
}

fn parse_content(value: Option<&Value>) -> IndexMap<String, Value> {
    value
        .and_then(Value::as_object)
        .map(|content| {
            content
                .iter()
                .map(|(media, entry)| {
                    let schema = entry.get("schema").cloned().unwrap_or_else(|| json!({}));
                    (media.clone(), schema)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_request_body(body: &Value) -> RequestBodySpec {
    RequestBodySpec {
        required: body
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        content: parse_content(body.get("content")),
    }
}

fn parse_response(response: &Value) -> ResponseSpec {
    let headers = response
        .get("headers")
        .and_then(Value::as_object)
        .map(|headers: &Map<String, Value>| {
            headers
                .iter()
                .map(|(name, header)| {
                    let spec = ResponseHeaderSpec {
                        required: header
                            .get("required")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                        schema: header.get("schema").cloned().unwrap_or_else(|| json!({})),
                    };
                    (name.to_ascii_lowercase(), spec)
                })
                .collect()
        })
        .unwrap_or_default();

    ResponseSpec {
        content: parse_content(response.get("content")),
        headers,
    }
}
