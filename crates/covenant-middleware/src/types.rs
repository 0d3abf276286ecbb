//! Common types used throughout the middleware chain.
//!
//! This module defines the HTTP request and response types used by middleware
//! and the JSON error envelope returned when validation rejects an exchange.

use bytes::Bytes;
use covenant_core::ValidationError;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde_json::json;

/// The HTTP request type used in the middleware chain.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware chain.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building error responses.
pub trait ResponseExt {
    /// Creates a JSON error response.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;

    /// Creates the JSON error envelope for a validation failure.
    ///
    /// The envelope carries the error code, message, and every violation:
    ///
    /// ```json
    /// {"error": {"code": "...", "message": "...", "violations": [...]}}
    /// ```
    fn validation_error(error: &ValidationError) -> Response;
}

impl ResponseExt for Response {
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = json!({
            "error": {
                "code": code,
                "message": message
            }
        });

        json_response(status, body.to_string())
    }

    fn validation_error(error: &ValidationError) -> Response {
        let body = json!({
            "error": {
                "code": error.error_code(),
                "message": error.to_string(),
                "violations": error.violations(),
            }
        });

        json_response(error.status_code(), body.to_string())
    }
}

fn json_response(status: StatusCode, body: String) -> Response {
    let mut response = http::Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
