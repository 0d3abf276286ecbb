//! Error types for contract validation.
//!
//! [`ValidationError`] is the single terminal outcome of a validated exchange.
//! A "no matching operation" outcome is not an error at all: resolvers return
//! `None` and the orchestrator stays inert.
//!
//! | Variant | Side | HTTP status |
//! |---|---|---|
//! | `RequestMalformed` | request | 400 |
//! | `Coercion` | request | 400 |
//! | `Request` | request | 400 |
//! | `ResponseMalformed` | response | 500 |
//! | `Response` | response | 500 |

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result type alias using [`ValidationError`].
pub type ValidationResult<T> = Result<T, ValidationError>;

/// The part of an exchange a [`Violation`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractPart {
    /// A path template parameter.
    Path,
    /// A query string parameter.
    Query,
    /// A request header parameter.
    Header,
    /// The request `Content-Type`.
    ContentType,
    /// The request body.
    RequestBody,
    /// The response status code.
    ResponseStatus,
    /// A response header.
    ResponseHeader,
    /// The response body.
    ResponseBody,
}

impl ContractPart {
    /// Returns the short name used in pointers and log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::ContentType => "content_type",
            Self::RequestBody => "body",
            Self::ResponseStatus => "status",
            Self::ResponseHeader => "response_header",
            Self::ResponseBody => "response_body",
        }
    }
}

impl fmt::Display for ContractPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single nonconformance between an exchange and its contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Which part of the exchange is nonconforming.
    pub part: ContractPart,
    /// Location inside that part (parameter name or JSON pointer).
    pub pointer: String,
    /// Human-readable description.
    pub message: String,
    /// Location in the schema that rejected the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
    /// The offending value, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Violation {
    /// Creates a violation without schema location or value.
    pub fn new(part: ContractPart, pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            part,
            pointer: pointer.into(),
            message: message.into(),
            schema_path: None,
            value: None,
        }
    }

    /// Attaches the schema location that produced this violation.
    pub fn with_schema_path(mut self, schema_path: impl Into<String>) -> Self {
        self.schema_path = Some(schema_path.into());
        self
    }

    /// Attaches the offending value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.part, self.pointer, self.message)?;
        if let Some(ref schema_path) = self.schema_path {
            write!(f, " (schema: {})", schema_path)?;
        }
        Ok(())
    }
}

/// Terminal failure of a validated exchange.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The request could not be decoded (bad JSON, bad form encoding).
    #[error("malformed request: {message}")]
    RequestMalformed {
        /// What could not be decoded.
        message: String,
    },

    /// The response body could not be decoded as JSON.
    #[error("malformed response (status {status}): {message}")]
    ResponseMalformed {
        /// Response status code.
        status: u16,
        /// What could not be decoded.
        message: String,
    },

    /// A path value could not be converted to its declared type.
    #[error("cannot coerce parameter '{parameter}' value '{value}' to {expected}")]
    Coercion {
        /// Parameter name.
        parameter: String,
        /// Declared type.
        expected: String,
        /// The raw value.
        value: String,
    },

    /// The request does not conform to the operation's contract.
    #[error("request validation failed for '{operation_id}': {} violation(s)", .violations.len())]
    Request {
        /// Operation identifier.
        operation_id: String,
        /// Individual nonconformances.
        violations: Vec<Violation>,
    },

    /// The response does not conform to the operation's contract.
    #[error(
        "response validation failed for '{operation_id}' (status {status}): {} violation(s)",
        .violations.len()
    )]
    Response {
        /// Operation identifier.
        operation_id: String,
        /// Response status code.
        status: u16,
        /// Individual nonconformances.
        violations: Vec<Violation>,
    },
}

impl ValidationError {
    /// Creates a request-malformed error.
    pub fn request_malformed(message: impl Into<String>) -> Self {
        Self::RequestMalformed {
            message: message.into(),
        }
    }

    /// Creates a response-malformed error.
    pub fn response_malformed(status: u16, message: impl Into<String>) -> Self {
        Self::ResponseMalformed {
            status,
            message: message.into(),
        }
    }

    /// Creates a coercion error.
    pub fn coercion(
        parameter: impl Into<String>,
        expected: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            parameter: parameter.into(),
            expected: expected.into(),
            value: value.into(),
        }
    }

    /// Returns `true` for failures caused by the client's request.
    pub const fn is_request_side(&self) -> bool {
        matches!(
            self,
            Self::RequestMalformed { .. } | Self::Coercion { .. } | Self::Request { .. }
        )
    }

    /// Returns the HTTP status a server should answer with.
    pub const fn status_code(&self) -> StatusCode {
        if self.is_request_side() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Returns a stable machine-readable error code.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RequestMalformed { .. } => "REQUEST_MALFORMED",
            Self::ResponseMalformed { .. } => "RESPONSE_MALFORMED",
            Self::Coercion { .. } => "PARAMETER_COERCION_FAILED",
            Self::Request { .. } => "REQUEST_VALIDATION_FAILED",
            Self::Response { .. } => "RESPONSE_VALIDATION_FAILED",
        }
    }

    /// Returns the individual violations, if this is a contract violation.
    ///
    /// A coercion failure is reported as a single path violation.
    pub fn violations(&self) -> Vec<Violation> {
        match self {
            Self::Request { violations, .. } | Self::Response { violations, .. } => {
                violations.clone()
            }
            Self::Coercion {
                parameter,
                expected,
                value,
            } => vec![Violation::new(
                ContractPart::Path,
                parameter.clone(),
                format!("expected {}", expected),
            )
            .with_value(Value::String(value.clone()))],
            Self::RequestMalformed { .. } | Self::ResponseMalformed { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_side_errors_map_to_bad_request() {
        let errors = [
            ValidationError::request_malformed("bad json"),
            ValidationError::coercion("id", "integer", "abc"),
            ValidationError::Request {
                operation_id: "getPet".into(),
                violations: vec![],
            },
        ];
        for error in errors {
            assert!(error.is_request_side());
            assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_response_side_errors_map_to_internal_error() {
        let error = ValidationError::Response {
            operation_id: "getPet".into(),
            status: 200,
            violations: vec![Violation::new(
                ContractPart::ResponseBody,
                "/name",
                "\"name\" is a required property",
            )],
        };
        assert!(!error.is_request_side());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.error_code(), "RESPONSE_VALIDATION_FAILED");
        assert_eq!(error.violations().len(), 1);
    }

    #[test]
    fn test_display_counts_violations() {
        let error = ValidationError::Request {
            operation_id: "listPets".into(),
            violations: vec![
                Violation::new(ContractPart::Query, "limit", "expected integer"),
                Violation::new(ContractPart::Header, "x-trace", "missing"),
            ],
        };
        assert_eq!(
            error.to_string(),
            "request validation failed for 'listPets': 2 violation(s)"
        );
    }

    #[test]
    fn test_coercion_surfaces_as_path_violation() {
        let error = ValidationError::coercion("id", "integer", "abc");
        let violations = error.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].part, ContractPart::Path);
        assert_eq!(violations[0].pointer, "id");
        assert_eq!(violations[0].value, Some(Value::String("abc".into())));
    }

    #[test]
    fn test_violation_display_includes_schema_path() {
        let violation = Violation::new(ContractPart::RequestBody, "/age", "not an integer")
            .with_schema_path("/properties/age/type");
        assert_eq!(
            violation.to_string(),
            "body./age: not an integer (schema: /properties/age/type)"
        );
    }
}
