//! Collaborator seams used by the validation orchestrator.
//!
//! The orchestrator sequences an exchange but owns no schema knowledge. It
//! asks an [`OperationResolver`] which operation a request targets and a
//! [`SchemaValidator`] whether the unpacked data conforms to it. Both are
//! read-only after construction and shared across concurrent exchanges.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::ValidationError;
use crate::operation::Operation;
use crate::options::ValidatorOptions;
use crate::params::{HeaderSet, ParameterSet};

/// Number of path parameters stored inline.
const INLINE_PARAMS: usize = 4;

/// Raw `(name, value)` path segments bound by a template, in template order.
pub type RawPathParams = SmallVec<[(String, String); INLINE_PARAMS]>;

/// The outcome of resolving a request to an operation.
#[derive(Debug, Clone)]
pub struct OperationMatch {
    /// The matched operation.
    pub operation: Arc<Operation>,
    /// Raw path segments bound by the template.
    pub path_params: RawPathParams,
}

impl OperationMatch {
    /// Creates a match.
    pub fn new(operation: Arc<Operation>, path_params: RawPathParams) -> Self {
        Self {
            operation,
            path_params,
        }
    }

    /// The matched operation's identifier.
    pub fn operation_id(&self) -> &str {
        &self.operation.id
    }

    /// Looks up a raw path segment by name.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A buffered response body as handed to the response validator.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// The body parsed as JSON.
    Json(Value),
    /// The body left unparsed.
    Raw(Bytes),
}

impl ResponseData {
    /// Returns the JSON value, if the body was parsed.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

/// The request body as it was decoded, before it was merged with the query
/// and path parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackedBody {
    /// Field names decoded from the body, in body order.
    pub fields: Vec<String>,
    /// Whether the body was a URL-encoded form.
    pub is_form: bool,
}

impl UnpackedBody {
    /// Records the fields of a decoded body.
    pub fn new(params: &ParameterSet, is_form: bool) -> Self {
        Self {
            fields: params.keys().map(str::to_string).collect(),
            is_form,
        }
    }
}

/// Maps requests to contract operations.
pub trait OperationResolver: Send + Sync {
    /// Finds the operation for `method` and `path`. `None` means the request
    /// is outside the contract.
    fn resolve(&self, method: &Method, path: &str) -> Option<OperationMatch>;

    /// Converts the matched path segments to their declared types.
    ///
    /// Fails with [`ValidationError::Coercion`] when a segment cannot be
    /// converted.
    fn coerce_path_params(
        &self,
        matched: &OperationMatch,
        options: &ValidatorOptions,
    ) -> Result<ParameterSet, ValidationError>;
}

/// Checks unpacked exchange data against an operation's schemas.
pub trait SchemaValidator: Send + Sync {
    /// Validates request parameters and headers.
    ///
    /// `params` is the merged query, body and path mapping. `body` names the
    /// fields that came from the request body; it is `None` when no body was
    /// decoded. Implementations may replace values in `params` with coerced
    /// ones.
    fn validate_request(
        &self,
        operation: &Operation,
        params: &mut ParameterSet,
        body: Option<&UnpackedBody>,
        headers: &HeaderSet,
        options: &ValidatorOptions,
    ) -> Result<(), ValidationError>;

    /// Validates a response. `strict` requires the status and media type to
    /// be declared exactly.
    fn validate_response(
        &self,
        operation: &Operation,
        status: StatusCode,
        headers: &HeaderMap,
        data: &ResponseData,
        strict: bool,
        options: &ValidatorOptions,
    ) -> Result<(), ValidationError>;
}

impl<T: OperationResolver + ?Sized> OperationResolver for Arc<T> {
    fn resolve(&self, method: &Method, path: &str) -> Option<OperationMatch> {
        (**self).resolve(method, path)
    }

    fn coerce_path_params(
        &self,
        matched: &OperationMatch,
        options: &ValidatorOptions,
    ) -> Result<ParameterSet, ValidationError> {
        (**self).coerce_path_params(matched, options)
    }
}

impl<T: SchemaValidator + ?Sized> SchemaValidator for Arc<T> {
    fn validate_request(
        &self,
        operation: &Operation,
        params: &mut ParameterSet,
        body: Option<&UnpackedBody>,
        headers: &HeaderSet,
        options: &ValidatorOptions,
    ) -> Result<(), ValidationError> {
        (**self).validate_request(operation, params, body, headers, options)
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
        (**self).validate_response(operation, status, headers, data, strict, options)
    }
}
