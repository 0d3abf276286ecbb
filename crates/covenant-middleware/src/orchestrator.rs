//! The validation orchestrator.
//!
//! [`ContractValidation`] composes an [`OperationResolver`], a
//! [`SchemaValidator`] and a [`ParameterUnpacker`] into the two halves of a
//! validated exchange. An [`Exchange`] is created per request; when no
//! operation matches it is inert and both halves succeed without touching
//! the request environment.
//!
//! Parameter sources are overlaid in a fixed order onto one accumulator:
//! query, then body, then path. Later sources win on key collisions.
//!
//! The orchestrator never logs. Failures are returned to the caller, which
//! decides how to surface them.

use covenant_core::{
    Operation, OperationMatch, OperationResolver, ParameterSet, RequestEnv, ResponseData,
    SchemaValidator, UnpackedBody, ValidationError, ValidatorOptions,
};
use covenant_extract::{ParameterUnpacker, RawRequest, UnpackOptions};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, StatusCode};
use serde_json::{Map, Value};

use crate::drain::ResponseBuffer;

const JSON_PREFIX: &str = "application/json";

/// Contract validation for one resolver/validator pair and one set of
/// options.
///
/// The options are fixed at construction. Instances are shared read-only
/// across concurrent exchanges.
///
/// # Example
///
/// ```ignore
/// use covenant_middleware::ContractValidation;
/// use covenant_core::{RequestEnv, ValidatorOptions};
///
/// let validation = ContractValidation::new(router, validator, ValidatorOptions::default());
/// let exchange = validation.exchange(request.method(), request.path());
///
/// let mut env = RequestEnv::new();
/// exchange.validate_request(&mut env, &request)?;
/// ```
#[derive(Debug)]
pub struct ContractValidation<R, V> {
    resolver: R,
    validator: V,
    options: ValidatorOptions,
    unpacker: ParameterUnpacker,
}

impl<R, V> ContractValidation<R, V>
where
    R: OperationResolver,
    V: SchemaValidator,
{
    /// Creates an orchestrator.
    pub fn new(resolver: R, validator: V, options: ValidatorOptions) -> Self {
        let unpacker = ParameterUnpacker::new(UnpackOptions::from(&options));
        Self {
            resolver,
            validator,
            options,
            unpacker,
        }
    }

    /// Returns the options.
    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Returns the resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Returns the schema validator.
    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Resolves the operation for a request without opening an exchange.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<OperationMatch> {
        self.resolver.resolve(method, path)
    }

    /// Resolves the operation for a request and opens an exchange.
    pub fn exchange(&self, method: &Method, path: &str) -> Exchange<'_, R, V> {
        Exchange {
            validation: self,
            matched: self.resolver.resolve(method, path),
        }
    }

    /// Opens an exchange for an operation that was resolved earlier.
    pub fn exchange_for(&self, matched: Option<OperationMatch>) -> Exchange<'_, R, V> {
        Exchange {
            validation: self,
            matched,
        }
    }
}

/// One request/response exchange, bound to the operation it targets.
#[derive(Debug)]
pub struct Exchange<'a, R, V> {
    validation: &'a ContractValidation<R, V>,
    matched: Option<OperationMatch>,
}

impl<'a, R, V> Exchange<'a, R, V>
where
    R: OperationResolver,
    V: SchemaValidator,
{
    /// Returns `true` if an operation was resolved.
    pub fn is_matched(&self) -> bool {
        self.matched.is_some()
    }

    /// Returns the resolved operation match.
    pub fn matched(&self) -> Option<&OperationMatch> {
        self.matched.as_ref()
    }

    /// Returns the resolved operation.
    pub fn operation(&self) -> Option<&Operation> {
        self.matched.as_ref().map(|m| m.operation.as_ref())
    }

    /// Validates the request side of the exchange.
    ///
    /// On a matched operation this writes, in order:
    ///
    /// 1. the path parameters at `path_hash_key` (empty and case-insensitive
    ///    when path coercion is off)
    /// 2. the query parameters overlaid with the body parameters at
    ///    `params_key`, and the headers at `headers_key`
    /// 3. the path parameters into `params_key`, when there are any
    ///
    /// The schema validator then checks `params_key` in place, so coerced
    /// values stay in the environment whatever the outcome. It is told which
    /// fields came from the body, and whether that body was a form, so that
    /// only those fields are checked against the body schema.
    ///
    /// After a successful check, and when `query_hash_key` is set, every key
    /// of the native query hash gets its value from `params_key`. The native
    /// hash is updated in place, keeping its key set, and a copy is stored at
    /// `query_hash_key`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::Coercion`] if a path value cannot be converted
    /// - [`ValidationError::RequestMalformed`] if the body cannot be decoded
    /// - [`ValidationError::Request`] if the request does not conform
    pub fn validate_request(
        &self,
        env: &mut RequestEnv,
        request: &RawRequest,
    ) -> Result<(), ValidationError> {
        let Some(matched) = &self.matched else {
            return Ok(());
        };
        let options = &self.validation.options;
        let unpacker = &self.validation.unpacker;

        let path_params = if options.coerce_path_params {
            self.validation
                .resolver
                .coerce_path_params(matched, options)?
        } else {
            ParameterSet::case_insensitive()
        };
        env.insert_params(options.path_hash_key.as_str(), path_params.clone());

        let query = unpacker.unpack_query_params(request);
        let (body, sent) = match unpacker.unpack_body(request)? {
            Some((body, is_form)) => {
                let sent = UnpackedBody::new(&body, is_form);
                (body, Some(sent))
            }
            None => (ParameterSet::new(), None),
        };
        let headers = unpacker.unpack_headers(request);

        let mut params = query.merged(body);
        if !path_params.is_empty() {
            params.merge(path_params);
        }
        env.insert_params(options.params_key.as_str(), params);
        env.insert_headers(options.headers_key.as_str(), headers.clone());

        let params = env.params_entry(&options.params_key);
        self.validation.validator.validate_request(
            &matched.operation,
            params,
            sent.as_ref(),
            &headers,
            options,
        )?;

        copy_to_query_hash(env, options);
        Ok(())
    }

    /// Validates the response side of the exchange.
    ///
    /// The buffer is parsed as JSON when content-type sensitive parsing is
    /// off or the `Content-Type` starts with `application/json`; an empty
    /// buffer parses to `{}`. Other bodies reach the validator unparsed.
    /// `strict` requires the status and media type to be declared exactly.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ResponseMalformed`] if a JSON body cannot be parsed
    /// - [`ValidationError::Response`] if the response does not conform
    pub fn validate_response(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
        body: &ResponseBuffer,
        strict: bool,
    ) -> Result<(), ValidationError> {
        let Some(matched) = &self.matched else {
            return Ok(());
        };
        let options = &self.validation.options;

        let data = response_data(options, status, headers, body)?;
        self.validation.validator.validate_response(
            &matched.operation,
            status,
            headers,
            &data,
            strict,
            options,
        )
    }
}

/// Decodes a buffered response body according to the parse policy.
///
/// # Errors
///
/// Returns [`ValidationError::ResponseMalformed`] when the body should be
/// JSON and is not.
pub fn response_data(
    options: &ValidatorOptions,
    status: StatusCode,
    headers: &HeaderMap,
    body: &ResponseBuffer,
) -> Result<ResponseData, ValidationError> {
    let declares_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(JSON_PREFIX));

    if options.parse_response_by_content_type && !declares_json {
        return Ok(ResponseData::Raw(body.as_bytes().clone()));
    }

    if body.is_empty() {
        return Ok(ResponseData::Json(Value::Object(Map::new())));
    }

    serde_json::from_slice(body.as_bytes())
        .map(ResponseData::Json)
        .map_err(|e| ValidationError::response_malformed(status.as_u16(), e.to_string()))
}

fn copy_to_query_hash(env: &mut RequestEnv, options: &ValidatorOptions) {
    let Some(query_hash_key) = options.query_hash_key.as_deref() else {
        return;
    };
    if !env.native_query().is_some_and(|q| !q.is_empty()) {
        return;
    }
    let Some(mut native) = env.take_native_query() else {
        return;
    };

    if let Some(params) = env.params(&options.params_key) {
        for (key, value) in native.iter_mut() {
            if let Some(validated) = params.get(key) {
                *value = validated.clone();
            }
        }
    }

    let target = env.params_entry(query_hash_key);
    for (key, value) in native.iter() {
        target.insert(key, value.clone());
    }
    env.set_native_query(native);
}
