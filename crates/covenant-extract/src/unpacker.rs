//! Decoding of query strings, bodies, and headers into parameter mappings.

use covenant_core::{HeaderSet, ParameterSet, ValidatorOptions};
use http::Method;
use mime::Mime;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{UnpackError, UnpackSource};
use crate::request::RawRequest;

/// The unpacking subset of [`ValidatorOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Decode `application/x-www-form-urlencoded` bodies.
    pub allow_form_params: bool,
    /// Decode bodies of GET and HEAD requests.
    pub allow_get_body: bool,
    /// Decode the query string.
    pub allow_query_params: bool,
    /// Try JSON on bodies whose `Content-Type` is not JSON.
    pub optimistic_json: bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self::from(&ValidatorOptions::default())
    }
}

impl From<&ValidatorOptions> for UnpackOptions {
    fn from(options: &ValidatorOptions) -> Self {
        Self {
            allow_form_params: options.allow_form_params,
            allow_get_body: options.allow_get_body,
            allow_query_params: options.allow_query_params,
            optimistic_json: options.optimistic_json,
        }
    }
}

/// Decodes a request into parameter and header mappings.
///
/// Unpacking only decodes: values stay as the strings the client sent
/// (except JSON bodies, which are already typed). Conversion to declared
/// types happens later, during validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterUnpacker {
    options: UnpackOptions,
}

impl ParameterUnpacker {
    /// Creates an unpacker.
    #[must_use]
    pub fn new(options: UnpackOptions) -> Self {
        Self { options }
    }

    /// Returns the unpacker's options.
    #[must_use]
    pub fn options(&self) -> &UnpackOptions {
        &self.options
    }

    /// Parses the query string.
    ///
    /// Repeated keys and keys ending in `[]` become arrays; `name[key]`
    /// becomes a nested object. Returns an empty set when query parameters
    /// are disabled.
    #[must_use]
    pub fn unpack_query_params(&self, request: &RawRequest) -> ParameterSet {
        if !self.options.allow_query_params {
            return ParameterSet::new();
        }

        match request.query_string() {
            Some(query) => decode_urlencoded(query),
            None => ParameterSet::new(),
        }
    }

    /// Decodes the request body.
    ///
    /// Returns the decoded fields and whether they came from a form body.
    /// JSON is used when the request has no `Content-Type` or a JSON one
    /// (`application/json`, `application/*+json`); with optimistic JSON
    /// enabled any body is tried as JSON first and parse failures fall
    /// through silently.
    pub fn unpack_request_params(
        &self,
        request: &RawRequest,
    ) -> Result<(ParameterSet, bool), UnpackError> {
        Ok(self.unpack_body(request)?.unwrap_or_default())
    }

    /// Like [`unpack_request_params`](Self::unpack_request_params), but
    /// returns `None` when no body was decoded, so that `{}` is told apart
    /// from an absent or skipped body.
    pub fn unpack_body(
        &self,
        request: &RawRequest,
    ) -> Result<Option<(ParameterSet, bool)>, UnpackError> {
        let method = request.method();
        if (*method == Method::GET || *method == Method::HEAD) && !self.options.allow_get_body {
            return Ok(None);
        }

        if request.is_body_empty() {
            return Ok(None);
        }

        let media: Option<Mime> = request.content_type().and_then(|ct| ct.parse().ok());
        let declared_json = match (&media, request.content_type()) {
            (_, None) => true,
            (Some(parsed), Some(_)) => is_json(parsed),
            (None, Some(_)) => false,
        };

        if declared_json || self.options.optimistic_json {
            match serde_json::from_slice::<Value>(request.body()) {
                Ok(Value::Object(map)) => {
                    return Ok(Some((map.into_iter().collect(), false)));
                }
                Ok(other) if declared_json => {
                    return Err(UnpackError::not_an_object(json_kind(&other)));
                }
                Err(e) if declared_json => {
                    return Err(UnpackError::malformed(UnpackSource::Body, e.to_string()));
                }
                Ok(_) | Err(_) => {
                    debug!("optimistic JSON decoding failed, falling through");
                }
            }
        }

        if self.options.allow_form_params && media.as_ref().is_some_and(is_form) {
            let body = std::str::from_utf8(request.body())
                .map_err(|e| UnpackError::malformed(UnpackSource::Body, e.to_string()))?;
            return Ok(Some((decode_urlencoded(body), true)));
        }

        Ok(None)
    }

    /// Collects the request headers.
    #[must_use]
    pub fn unpack_headers(&self, request: &RawRequest) -> HeaderSet {
        HeaderSet::from_header_map(request.headers())
    }
}

fn is_json(media: &Mime) -> bool {
    media.type_() == mime::APPLICATION
        && (media.subtype() == mime::JSON || media.suffix() == Some(mime::JSON))
}

fn is_form(media: &Mime) -> bool {
    media.type_() == mime::APPLICATION && media.subtype() == mime::WWW_FORM_URLENCODED
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decodes `a=1&a=2&tags[]=x&filter[name]=y` into a parameter set.
///
/// Malformed input decodes leniently: undecodable pairs are dropped.
fn decode_urlencoded(input: &str) -> ParameterSet {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(input).unwrap_or_default();

    let mut params = ParameterSet::new();
    for (key, value) in pairs {
        if let Some(name) = key.strip_suffix("[]") {
            push_array(&mut params, name, value);
        } else if let Some((name, field)) = split_nested(&key) {
            let entry = params
                .get_mut(name)
                .filter(|v| v.is_object())
                .map(std::mem::take);
            let mut object = match entry {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            object.insert(field.to_string(), Value::String(value));
            params.insert(name, Value::Object(object));
        } else if params.contains_key(&key) {
            push_array(&mut params, &key, value);
        } else {
            params.insert(key, Value::String(value));
        }
    }
    params
}

fn push_array(params: &mut ParameterSet, name: &str, value: String) {
    match params.get_mut(name) {
        Some(Value::Array(items)) => items.push(Value::String(value)),
        Some(existing) => {
            let first = std::mem::take(existing);
            *existing = Value::Array(vec![first, Value::String(value)]);
        }
        None => {
            params.insert(name, Value::Array(vec![Value::String(value)]));
        }
    }
}

/// Splits `name[field]` into `("name", "field")`.
fn split_nested(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let field = key[open + 1..].strip_suffix(']')?;
    if open == 0 || field.is_empty() || field.contains('[') {
        return None;
    }
    Some((&key[..open], field))
}
