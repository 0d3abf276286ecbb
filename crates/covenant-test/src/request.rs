//! Test request building.

use crate::error::TestError;
use bytes::Bytes;
use covenant_extract::RawRequest;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::Full;
use serde::Serialize;

/// A request exchanged in a test.
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl TestRequest {
    /// Creates a new GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Creates a new POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Creates a new PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Creates a new PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Creates a new DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// A raw view of this request for the orchestrator.
    pub fn to_raw_request(&self) -> RawRequest {
        RawRequest::new(
            self.method.clone(),
            self.uri.clone(),
            self.headers.clone(),
            self.body.clone(),
        )
    }

    /// Converts this request to an HTTP request.
    pub fn into_http_request(self) -> http::Request<Full<Bytes>> {
        let mut request = http::Request::new(Full::new(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

/// Builder for constructing test requests.
///
/// Invalid headers or bodies do not panic; the first problem is reported by
/// [`build`](Self::build).
#[must_use]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    query: Vec<String>,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Appends a percent-encoded query pair.
    ///
    /// # Example
    ///
    /// ```
    /// use covenant_test::TestRequest;
    ///
    /// let request = TestRequest::get("/pets")
    ///     .query("name", "Rex & co")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.uri.query(), Some("name=Rex%20%26%20co"));
    /// ```
    pub fn query(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.query.push(format!(
            "{}={}",
            urlencoding::encode(name.as_ref()),
            urlencoding::encode(value.as_ref())
        ));
        self
    }

    /// Sets a header on the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let parsed = HeaderName::try_from(name.as_ref())
            .map_err(|e| TestError::RequestBuild(format!("Invalid header name: {e}")))
            .and_then(|name| {
                HeaderValue::try_from(value.as_ref())
                    .map(|value| (name, value))
                    .map_err(|e| TestError::RequestBuild(format!("Invalid header value: {e}")))
            });
        match parsed {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(e) => self.fail(e),
        }
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the request body as JSON.
    ///
    /// This also sets the `Content-Type` header to `application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(TestError::Json(e)),
        }
        self.content_type("application/json")
    }

    /// Sets the request body as form-urlencoded.
    ///
    /// This also sets the `Content-Type` header to
    /// `application/x-www-form-urlencoded`.
    pub fn form<T: Serialize>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => self.body = Some(Bytes::from(encoded)),
            Err(e) => self.fail(TestError::RequestBuild(format!("Invalid form body: {e}"))),
        }
        self.content_type("application/x-www-form-urlencoded")
    }

    /// Builds the test request.
    ///
    /// A non-empty body gets a `Content-Length` header unless one is set.
    pub fn build(mut self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut uri = self.uri;
        if !self.query.is_empty() {
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&self.query.join("&"));
        }
        let uri: Uri = uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;

        let body = self.body.unwrap_or_default();
        if !body.is_empty() && !self.headers.contains_key(header::CONTENT_LENGTH) {
            self.headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body,
        })
    }

    fn fail(&mut self, error: TestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_request() {
        let request = TestRequest::get("/pets/1").build().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path(), "/pets/1");
        assert!(request.body.is_empty());
        assert!(!request.headers.contains_key(header::CONTENT_LENGTH));
    }

    #[test]
    fn test_query_appends_to_existing() {
        let request = TestRequest::get("/pets?limit=5")
            .query("tag", "a/b")
            .build()
            .unwrap();
        assert_eq!(request.uri.query(), Some("limit=5&tag=a%2Fb"));
    }

    #[test]
    fn test_json_body_sets_headers() {
        let request = TestRequest::post("/pets")
            .json(&json!({"name": "Rex"}))
            .build()
            .unwrap();
        assert_eq!(request.headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(request.headers[header::CONTENT_LENGTH], "14");
        assert_eq!(request.body, Bytes::from_static(br#"{"name":"Rex"}"#));
    }

    #[test]
    fn test_form_body() {
        let request = TestRequest::post("/pets")
            .form(&[("name", "Rex"), ("age", "3")])
            .build()
            .unwrap();
        assert_eq!(request.body, Bytes::from_static(b"name=Rex&age=3"));
        assert_eq!(
            request.headers[header::CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_invalid_header_reported_at_build() {
        let result = TestRequest::get("/pets")
            .header("bad header", "x")
            .build();
        assert!(matches!(result, Err(TestError::RequestBuild(_))));
    }

    #[test]
    fn test_raw_request_view() {
        let request = TestRequest::get("/pets/1?limit=2").build().unwrap();
        let raw = request.to_raw_request();
        assert_eq!(raw.path(), "/pets/1");
        assert_eq!(raw.query_string(), Some("limit=2"));
    }

    #[test]
    fn test_into_http_request() {
        let request = TestRequest::delete("/pets/1")
            .header("x-trace", "abc")
            .build()
            .unwrap()
            .into_http_request();
        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.headers()["x-trace"], "abc");
    }
}
