//! Unpacking error types.
//!
//! This module provides error types for unpacking failures, including
//! information about which part of the request could not be decoded.

use std::fmt;

use covenant_core::ValidationError;
use http::StatusCode;
use thiserror::Error;

/// Part of the request being unpacked when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackSource {
    /// Query string parameters
    Query,
    /// Request body (JSON, form)
    Body,
    /// Content-Type header
    ContentType,
}

impl fmt::Display for UnpackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Body => write!(f, "body"),
            Self::ContentType => write!(f, "content-type"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnpackErrorKind {
    /// The data is not valid in its declared encoding
    Malformed,
    /// A JSON body decoded to something other than an object
    NotAnObject,
}

/// Error that occurs while unpacking a request.
///
/// # Example
///
/// ```rust
/// use covenant_extract::{UnpackError, UnpackSource};
/// use http::StatusCode;
///
/// let err = UnpackError::malformed(UnpackSource::Body, "expected value at line 1 column 1");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.unpack_source(), UnpackSource::Body);
/// assert!(err.to_string().contains("line 1"));
/// ```
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct UnpackError {
    unpack_source: UnpackSource,
    kind: UnpackErrorKind,
    message: String,
}

impl UnpackError {
    /// Creates an error for data that cannot be decoded.
    #[must_use]
    pub fn malformed(source: UnpackSource, details: impl Into<String>) -> Self {
        let details = details.into();
        Self {
            unpack_source: source,
            kind: UnpackErrorKind::Malformed,
            message: format!("malformed {source}: {details}"),
        }
    }

    /// Creates an error for a JSON body whose top level is not an object.
    #[must_use]
    pub fn not_an_object(found: &str) -> Self {
        Self {
            unpack_source: UnpackSource::Body,
            kind: UnpackErrorKind::NotAnObject,
            message: format!("request body must be a JSON object, got {found}"),
        }
    }

    /// Returns the part of the request that failed.
    #[must_use]
    pub fn unpack_source(&self) -> UnpackSource {
        self.unpack_source
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Returns a stable error code string.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            UnpackErrorKind::Malformed => "MALFORMED_REQUEST",
            UnpackErrorKind::NotAnObject => "BODY_NOT_AN_OBJECT",
        }
    }
}

impl From<UnpackError> for ValidationError {
    fn from(err: UnpackError) -> Self {
        ValidationError::RequestMalformed {
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_an_object() {
        let err = UnpackError::not_an_object("array");
        assert_eq!(err.unpack_source(), UnpackSource::Body);
        assert_eq!(err.error_code(), "BODY_NOT_AN_OBJECT");
        assert_eq!(err.message(), "request body must be a JSON object, got array");
    }

    #[test]
    fn test_converts_to_request_malformed() {
        let err: ValidationError = UnpackError::malformed(UnpackSource::Body, "eof").into();
        assert_eq!(err, ValidationError::request_malformed("malformed body: eof"));
        assert!(err.is_request_side());
    }
}
