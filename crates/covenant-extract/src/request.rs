//! Raw view of an HTTP request.
//!
//! The [`RawRequest`] gives the unpacker read-only access to the parts of a
//! request it decodes. It is built once per exchange and never mutated.

use bytes::Bytes;
use http::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, Uri};

/// Read-only access to the method, URI, headers, and body of a request.
///
/// # Example
///
/// ```rust
/// use covenant_extract::RawRequest;
/// use http::{HeaderMap, Method, Uri};
/// use bytes::Bytes;
///
/// let request = RawRequest::new(
///     Method::GET,
///     Uri::from_static("/pets/42?verbose=true"),
///     HeaderMap::new(),
///     Bytes::new(),
/// );
///
/// assert_eq!(request.path(), "/pets/42");
/// assert_eq!(request.query_string(), Some("verbose=true"));
/// ```
#[derive(Debug, Clone)]
pub struct RawRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RawRequest {
    /// Creates a raw request view.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    /// Creates a raw request from buffered request parts.
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts, body: Bytes) -> Self {
        Self::new(
            parts.method.clone(),
            parts.uri.clone(),
            parts.headers.clone(),
            body,
        )
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> RawRequestBuilder {
        RawRequestBuilder::default()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path portion of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the query string if present.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a specific header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// Returns the Content-Length header value.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.header(CONTENT_LENGTH.as_str())
            .and_then(|v| v.parse().ok())
    }

    /// Checks if the request body is empty.
    #[must_use]
    pub fn is_body_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl From<http::Request<Bytes>> for RawRequest {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }
}

/// Builder for constructing a [`RawRequest`].
///
/// Method defaults to `GET` and URI to `/`. Values that fail to parse are
/// ignored.
#[derive(Debug, Default)]
pub struct RawRequestBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Bytes,
}

impl RawRequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        if let Ok(uri) = uri.parse() {
            self.uri = Some(uri);
        }
        self
    }

    /// Sets the headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a single header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the raw request.
    #[must_use]
    pub fn build(self) -> RawRequest {
        RawRequest {
            method: self.method.unwrap_or(Method::GET),
            uri: self.uri.unwrap_or_else(|| Uri::from_static("/")),
            headers: self.headers,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_request_builder() {
        let request = RawRequest::builder()
            .method(Method::POST)
            .uri("/api/pets?limit=1")
            .header("content-type", "application/json")
            .header("content-length", "17")
            .body(r#"{"name": "Alice"}"#)
            .build();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/api/pets");
        assert_eq!(request.query_string(), Some("limit=1"));
        assert_eq!(request.content_type(), Some("application/json"));
        assert_eq!(request.content_length(), Some(17));
        assert!(!request.is_body_empty());
    }

    #[test]
    fn test_builder_defaults() {
        let request = RawRequest::builder().uri("not a uri").build();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/");
        assert!(request.is_body_empty());
        assert_eq!(request.header("missing"), None);
    }

    #[test]
    fn test_from_http_request() {
        let request = http::Request::builder()
            .method(Method::PUT)
            .uri("/pets/1")
            .header("x-trace", "abc")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let raw = RawRequest::from(request);
        assert_eq!(raw.method(), &Method::PUT);
        assert_eq!(raw.header("x-trace"), Some("abc"));
        assert_eq!(raw.body(), &Bytes::from_static(b"{}"));
    }
}
