//! Operation descriptors.
//!
//! An [`Operation`] is the read-only description of one `(method, path
//! template)` pair of a contract. Operations are built once when the
//! contract is loaded and shared across concurrent exchanges behind an
//! [`Arc`].

use std::fmt;
use std::sync::Arc;

use http::{Method, StatusCode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a parameter lives in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Bound by the path template.
    Path,
    /// Part of the query string.
    Query,
    /// A request header.
    Header,
    /// A cookie.
    Cookie,
}

impl ParameterLocation {
    /// Parses the OpenAPI `in` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    /// The OpenAPI `in` value.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }

    /// Serialization style used when the parameter declares none.
    pub const fn default_style(&self) -> ParameterStyle {
        match self {
            Self::Path | Self::Header => ParameterStyle::Simple,
            Self::Query | Self::Cookie => ParameterStyle::Form,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenAPI parameter serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    /// `1,2,3`
    Simple,
    /// `id=1&id=2` or `id=1,2`
    Form,
    /// `.1.2.3`
    Label,
    /// `;id=1,2,3`
    Matrix,
    /// `1 2 3`
    SpaceDelimited,
    /// `1|2|3`
    PipeDelimited,
    /// `filter[name]=x`
    DeepObject,
}

impl ParameterStyle {
    /// Parses the OpenAPI `style` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(Self::Simple),
            "form" => Some(Self::Form),
            "label" => Some(Self::Label),
            "matrix" => Some(Self::Matrix),
            "spaceDelimited" => Some(Self::SpaceDelimited),
            "pipeDelimited" => Some(Self::PipeDelimited),
            "deepObject" => Some(Self::DeepObject),
            _ => None,
        }
    }

    /// Separator between array items when values are not exploded.
    pub const fn separator(&self) -> char {
        match self {
            Self::SpaceDelimited => ' ',
            Self::PipeDelimited => '|',
            _ => ',',
        }
    }
}

/// A declared operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: String,
    /// Where the parameter lives.
    pub location: ParameterLocation,
    /// Whether the parameter must be present.
    pub required: bool,
    /// JSON Schema for the value (`{}` when none is declared).
    pub schema: Value,
    /// Serialization style.
    pub style: ParameterStyle,
    /// Whether array/object values are exploded.
    pub explode: bool,
}

impl ParameterSpec {
    /// Creates a parameter with the location's default style.
    ///
    /// Path parameters are always required.
    pub fn new(name: impl Into<String>, location: ParameterLocation, schema: Value) -> Self {
        let style = location.default_style();
        Self {
            name: name.into(),
            location,
            required: location == ParameterLocation::Path,
            schema,
            style,
            explode: style == ParameterStyle::Form,
        }
    }

    /// Marks the parameter as required or optional.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required || self.location == ParameterLocation::Path;
        self
    }

    /// Overrides the serialization style and explode flag.
    pub fn with_style(mut self, style: ParameterStyle, explode: bool) -> Self {
        self.style = style;
        self.explode = explode;
        self
    }
}

/// A declared request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBodySpec {
    /// Whether a body must be sent.
    pub required: bool,
    /// Schema per media type, in declaration order.
    pub content: IndexMap<String, Value>,
}

impl RequestBodySpec {
    /// Finds the declared media type matching a `Content-Type` value.
    pub fn media_type(&self, content_type: &str) -> Option<(&str, &Value)> {
        find_media_type(&self.content, content_type)
    }
}

/// Key of an entry in an operation's `responses` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKey {
    /// An exact status code such as `200`.
    Code(u16),
    /// A range such as `2XX`, holding its leading digit.
    Range(u8),
    /// The `default` response.
    Default,
}

impl ResponseKey {
    /// Parses a `responses` map key.
    pub fn parse(s: &str) -> Option<Self> {
        if s == "default" {
            return Some(Self::Default);
        }
        let bytes = s.as_bytes();
        if bytes.len() == 3 && bytes[1..].eq_ignore_ascii_case(b"xx") {
            let digit = (bytes[0] as char).to_digit(10)?;
            return u8::try_from(digit).ok().filter(|d| (1..=5).contains(d)).map(Self::Range);
        }
        s.parse::<u16>()
            .ok()
            .filter(|c| (100..600).contains(c))
            .map(Self::Code)
    }
}

impl fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{}", code),
            Self::Range(digit) => write!(f, "{}XX", digit),
            Self::Default => f.write_str("default"),
        }
    }
}

/// A declared response header.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHeaderSpec {
    /// Whether the header must be present.
    pub required: bool,
    /// JSON Schema for the header value.
    pub schema: Value,
}

/// A declared response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSpec {
    /// Schema per media type, in declaration order. Empty when the response has no body.
    pub content: IndexMap<String, Value>,
    /// Declared headers keyed by lowercased name.
    pub headers: IndexMap<String, ResponseHeaderSpec>,
}

impl ResponseSpec {
    /// Finds the declared media type matching a `Content-Type` value.
    pub fn media_type(&self, content_type: &str) -> Option<(&str, &Value)> {
        find_media_type(&self.content, content_type)
    }
}

/// One operation of a contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Operation identifier (`operationId`, or `"METHOD /path"` when absent).
    pub id: String,
    /// HTTP method.
    pub method: Method,
    /// Path template, e.g. `/pets/{id}`.
    pub path: String,
    /// Short summary.
    pub summary: Option<String>,
    /// Whether the operation is deprecated.
    pub deprecated: bool,
    /// Declared parameters, path-level ones already merged in.
    pub parameters: Vec<ParameterSpec>,
    /// Declared request body.
    pub request_body: Option<RequestBodySpec>,
    /// Declared responses in declaration order.
    pub responses: IndexMap<ResponseKey, ResponseSpec>,
}

impl Operation {
    /// Creates an operation with no parameters, body, or responses.
    pub fn new(id: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            summary: None,
            deprecated: false,
            parameters: Vec::new(),
            request_body: None,
            responses: IndexMap::new(),
        }
    }

    /// Adds a parameter.
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the request body.
    pub fn with_request_body(mut self, body: RequestBodySpec) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Adds a response.
    pub fn with_response(mut self, key: ResponseKey, response: ResponseSpec) -> Self {
        self.responses.insert(key, response);
        self
    }

    /// Iterates over parameters declared at `location`.
    pub fn parameters_in(
        &self,
        location: ParameterLocation,
    ) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }

    /// Finds a parameter by name and location.
    pub fn parameter(&self, name: &str, location: ParameterLocation) -> Option<&ParameterSpec> {
        self.parameters_in(location).find(|p| p.name == name)
    }

    /// Looks up the response declared for `status`.
    ///
    /// Lookup order is exact code, then range, then `default`. In strict
    /// mode only an exact code matches.
    pub fn response_for(&self, status: StatusCode, strict: bool) -> Option<&ResponseSpec> {
        let code = status.as_u16();
        if let Some(response) = self.responses.get(&ResponseKey::Code(code)) {
            return Some(response);
        }
        if strict {
            return None;
        }
        u8::try_from(code / 100)
            .ok()
            .and_then(|digit| self.responses.get(&ResponseKey::Range(digit)))
            .or_else(|| self.responses.get(&ResponseKey::Default))
    }
}

/// A loaded contract: the set of operations a service exposes.
#[derive(Debug, Clone, Default)]
pub struct Contract {
    /// Contract title.
    pub title: String,
    /// Contract version.
    pub version: String,
    operations: Vec<Arc<Operation>>,
}

impl Contract {
    /// Creates a contract from its operations.
    pub fn new(
        title: impl Into<String>,
        version: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            operations: operations.into_iter().map(Arc::new).collect(),
        }
    }

    /// All operations in declaration order.
    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    /// Finds an operation by identifier.
    pub fn operation(&self, id: &str) -> Option<&Arc<Operation>> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if the contract declares no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Returns the media type essence: lowercased, without parameters.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn find_media_type<'a>(
    content: &'a IndexMap<String, Value>,
    content_type: &str,
) -> Option<(&'a str, &'a Value)> {
    let actual = essence(content_type);
    let major = actual.split('/').next().unwrap_or_default();

    let exact = content
        .iter()
        .find(|(declared, _)| essence(declared) == actual);
    let family = || {
        content.iter().find(|(declared, _)| {
            let declared = essence(declared);
            declared
                .strip_suffix("/*")
                .is_some_and(|prefix| prefix == major)
        })
    };
    let any = || content.iter().find(|(declared, _)| essence(declared) == "*/*");

    exact
        .or_else(family)
        .or_else(any)
        .map(|(declared, schema)| (declared.as_str(), schema))
}
