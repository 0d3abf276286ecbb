//! Request and response validation against operation schemas.
//!
//! [`OpenApiValidator`] checks unpacked exchange data against the JSON
//! Schemas an [`Operation`] declares. Every nonconformance found in one pass
//! is collected into a single [`ValidationError`].

use std::collections::HashMap;
use std::sync::Arc;

use covenant_core::coerce::{coerce_parameter, coerce_str, coerce_value};
use covenant_core::{
    ContractPart, HeaderSet, Operation, ParameterLocation, ParameterSet, ParameterStyle,
    ResponseData, ResponseHeaderSpec, SchemaValidator, UnpackedBody, ValidationError,
    ValidatorOptions, Violation,
};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, StatusCode};
use indexmap::IndexMap;
use jsonschema::Validator;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::{OpenApiDocument, SchemaDialect};

/// Validates exchanges against OpenAPI operation schemas.
///
/// Compiled schemas are cached per operation and location, so each schema
/// is compiled once and shared by all later exchanges.
#[derive(Default)]
pub struct OpenApiValidator {
    dialect: SchemaDialect,
    compiled: RwLock<HashMap<String, Arc<Validator>>>,
}

impl std::fmt::Debug for OpenApiValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenApiValidator")
            .field("dialect", &self.dialect)
            .field("cached_schemas", &self.compiled.read().len())
            .finish()
    }
}

impl OpenApiValidator {
    /// Create a validator for schemas written in `dialect`.
    pub fn new(dialect: SchemaDialect) -> Self {
        Self {
            dialect,
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// Create a validator matching a document's OpenAPI version.
    pub fn for_document(document: &OpenApiDocument) -> Self {
        Self::new(document.dialect())
    }

    /// Number of compiled schemas held in the cache.
    pub fn cached_schemas(&self) -> usize {
        self.compiled.read().len()
    }

    fn compile(&self, key: &str, schema: &Value) -> Result<Arc<Validator>, String> {
        if let Some(validator) = self.compiled.read().get(key) {
            return Ok(Arc::clone(validator));
        }

        let validator = match self.dialect {
            SchemaDialect::Draft4 => jsonschema::draft4::new(schema),
            SchemaDialect::Draft202012 => jsonschema::draft202012::new(schema),
        }
        .map_err(|e| e.to_string())?;

        let validator = Arc::new(validator);
        self.compiled
            .write()
            .insert(key.to_string(), Arc::clone(&validator));
        Ok(validator)
    }

    /// Validate `value` against `schema`, appending one violation per error.
    ///
    /// `pointer` prefixes each error's instance path.
    fn check(
        &self,
        key: &str,
        schema: &Value,
        value: &Value,
        part: ContractPart,
        pointer: &str,
        violations: &mut Vec<Violation>,
    ) {
        let validator = match self.compile(key, schema) {
            Ok(v) => v,
            Err(e) => {
                warn!(schema = key, error = %e, "schema failed to compile");
                violations.push(Violation::new(
                    part,
                    pointer,
                    format!("schema could not be compiled: {}", e),
                ));
                return;
            }
        };

        for error in validator.iter_errors(value) {
            let instance_path = error.instance_path.to_string();
            violations.push(
                Violation::new(part, format!("{}{}", pointer, instance_path), error.to_string())
                    .with_schema_path(error.schema_path.to_string())
                    .with_value(error.instance.clone().into_owned()),
            );
        }
    }

    fn check_parameters(
        &self,
        operation: &Operation,
        location: ParameterLocation,
        params: &mut ParameterSet,
        coerce: bool,
        violations: &mut Vec<Violation>,
    ) {
        let part = match location {
            ParameterLocation::Path => ContractPart::Path,
            _ => ContractPart::Query,
        };

        for spec in operation.parameters_in(location) {
            let Some(raw) = params.get(&spec.name).cloned() else {
                // Path values are structurally guaranteed by the router
                if spec.required && location != ParameterLocation::Path {
                    violations.push(Violation::new(
                        part,
                        spec.name.as_str(),
                        format!("missing required {} parameter '{}'", location, spec.name),
                    ));
                }
                continue;
            };

            let value = if coerce {
                match coerce_parameter(&raw, spec) {
                    Ok(coerced) => {
                        params.insert(&spec.name, coerced.clone());
                        coerced
                    }
                    Err(_) => raw,
                }
            } else {
                raw
            };

            let key = format!("{}#{}/{}", operation.id, location, spec.name);
            self.check(&key, &spec.schema, &value, part, &spec.name, violations);
        }
    }

    fn check_headers(
        &self,
        operation: &Operation,
        headers: &HeaderSet,
        violations: &mut Vec<Violation>,
    ) {
        for spec in operation.parameters_in(ParameterLocation::Header) {
            let Some(raw) = headers.get(&spec.name) else {
                if spec.required {
                    violations.push(Violation::new(
                        ContractPart::Header,
                        spec.name.as_str(),
                        format!("missing required header '{}'", spec.name),
                    ));
                }
                continue;
            };

            match coerce_parameter(&Value::String(raw.to_string()), spec) {
                Ok(value) => {
                    let key = format!("{}#header/{}", operation.id, spec.name);
                    self.check(
                        &key,
                        &spec.schema,
                        &value,
                        ContractPart::Header,
                        &spec.name,
                        violations,
                    );
                }
                Err(failure) => violations.push(
                    Violation::new(
                        ContractPart::Header,
                        spec.name.as_str(),
                        format!("expected {}", failure.expected),
                    )
                    .with_value(Value::String(raw.to_string())),
                ),
            }
        }
    }

    fn check_body(
        &self,
        operation: &Operation,
        params: &mut ParameterSet,
        sent: Option<&UnpackedBody>,
        headers: &HeaderSet,
        options: &ValidatorOptions,
        violations: &mut Vec<Violation>,
    ) {
        let Some(body) = &operation.request_body else {
            return;
        };

        let content_type = headers.get(CONTENT_TYPE.as_str());
        if options.check_content_type && !body.content.is_empty() {
            if let Some(ct) = content_type {
                if body.media_type(ct).is_none() {
                    violations.push(
                        Violation::new(
                            ContractPart::ContentType,
                            "content-type",
                            format!(
                                "'{}' is not one of the declared media types: {}",
                                ct,
                                body.content.keys().cloned().collect::<Vec<_>>().join(", ")
                            ),
                        )
                        .with_value(Value::String(ct.to_string())),
                    );
                    return;
                }
            }
        }

        let Some(sent) = sent else {
            if body.required && !body_sent(headers) {
                violations.push(Violation::new(
                    ContractPart::RequestBody,
                    "",
                    "request body is required",
                ));
            }
            return;
        };

        let media = match content_type {
            Some(ct) => body.media_type(ct),
            None => body
                .content
                .iter()
                .next()
                .map(|(media, schema)| (media.as_str(), schema)),
        };
        let Some((media, schema)) = media else {
            return;
        };

        if sent.is_form && options.coerce_form_params {
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for name in &sent.fields {
                    let (Some(raw), Some(property)) =
                        (params.get(name).cloned(), properties.get(name))
                    else {
                        continue;
                    };
                    if let Ok(coerced) = coerce_value(&raw, property, ParameterStyle::Form, true) {
                        params.insert(name, coerced);
                    }
                }
            }
        }

        let value = Value::Object(
            sent.fields
                .iter()
                .filter_map(|name| params.get(name).map(|v| (name.clone(), v.clone())))
                .collect::<Map<String, Value>>(),
        );

        let key = format!("{}#request/{}", operation.id, media);
        self.check(&key, schema, &value, ContractPart::RequestBody, "", violations);
    }

    fn check_response_headers(
        &self,
        operation: &Operation,
        status: StatusCode,
        declared: &IndexMap<String, ResponseHeaderSpec>,
        headers: &HeaderMap,
        violations: &mut Vec<Violation>,
    ) {
        for (name, spec) in declared {
            let Some(raw) = headers.get(name.as_str()).and_then(|v| v.to_str().ok()) else {
                if spec.required {
                    violations.push(Violation::new(
                        ContractPart::ResponseHeader,
                        name.as_str(),
                        format!("missing required response header '{}'", name),
                    ));
                }
                continue;
            };

            let value = coerce_str(raw, &spec.schema)
                .unwrap_or_else(|_| Value::String(raw.to_string()));
            let key = format!("{}#response/{}/header/{}", operation.id, status.as_u16(), name);
            self.check(
                &key,
                &spec.schema,
                &value,
                ContractPart::ResponseHeader,
                name,
                violations,
            );
        }
    }
}

fn body_sent(headers: &HeaderSet) -> bool {
    headers.contains(TRANSFER_ENCODING.as_str())
        || headers
            .get(CONTENT_LENGTH.as_str())
            .and_then(|len| len.trim().parse::<u64>().ok())
            .is_some_and(|len| len > 0)
}

impl SchemaValidator for OpenApiValidator {
    fn validate_request(
        &self,
        operation: &Operation,
        params: &mut ParameterSet,
        body: Option<&UnpackedBody>,
        headers: &HeaderSet,
        options: &ValidatorOptions,
    ) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        self.check_parameters(
            operation,
            ParameterLocation::Path,
            params,
            false,
            &mut violations,
        );
        self.check_parameters(
            operation,
            ParameterLocation::Query,
            params,
            options.coerce_query_params,
            &mut violations,
        );
        if options.check_header {
            self.check_headers(operation, headers, &mut violations);
        }
        self.check_body(operation, params, body, headers, options, &mut violations);

        if violations.is_empty() {
            debug!(operation_id = %operation.id, "request conforms");
            Ok(())
        } else {
            Err(ValidationError::Request {
                operation_id: operation.id.clone(),
                violations,
            })
        }
    }

    fn validate_response(
        &self,
        operation: &Operation,
        status: StatusCode,
        headers: &HeaderMap,
        data: &ResponseData,
        strict: bool,
        options: &ValidatorOptions,
    ) -> Result<(), ValidationError> {
        if options.validate_success_only && !status.is_success() {
            return Ok(());
        }

        let mut violations = Vec::new();

        match operation.response_for(status, strict) {
            None if strict => violations.push(Violation::new(
                ContractPart::ResponseStatus,
                status.as_str(),
                format!("status {} is not declared", status.as_u16()),
            )),
            None => {}
            Some(response) => {
                self.check_response_headers(
                    operation,
                    status,
                    &response.headers,
                    headers,
                    &mut violations,
                );

                if !response.content.is_empty() {
                    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
                    let media = match content_type {
                        Some(ct) => response.media_type(ct),
                        None => response
                            .content
                            .iter()
                            .next()
                            .map(|(media, schema)| (media.as_str(), schema)),
                    };

                    match (media, data.as_json()) {
                        (Some((media, schema)), Some(value)) => {
                            let key =
                                format!("{}#response/{}/{}", operation.id, status.as_u16(), media);
                            self.check(
                                &key,
                                schema,
                                value,
                                ContractPart::ResponseBody,
                                "",
                                &mut violations,
                            );
                        }
                        (Some(_), None) => {}
                        (None, _) if strict => violations.push(Violation::new(
                            ContractPart::ResponseHeader,
                            "content-type",
                            format!(
                                "'{}' is not one of the declared media types: {}",
                                content_type.unwrap_or_default(),
                                response.content.keys().cloned().collect::<Vec<_>>().join(", ")
                            ),
                        )),
                        (None, _) => {}
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Response {
                operation_id: operation.id.clone(),
                status: status.as_u16(),
                violations,
            })
        }
    }
}
