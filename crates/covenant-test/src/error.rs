//! Test error types.

use std::fmt;

use covenant_core::ValidationError;
use http::{Method, StatusCode};

/// Errors reported by the conformance assertions.
#[derive(Debug)]
pub enum TestError {
    /// Request building failed
    RequestBuild(String),
    /// Response body reading failed
    BodyRead(String),
    /// JSON serialization/deserialization failed
    Json(serde_json::Error),
    /// The contract could not be loaded or routed
    Contract(String),
    /// The request does not match any documented operation
    Undocumented {
        /// Request method
        method: Method,
        /// Request path
        path: String,
    },
    /// The response status is not the one the test expected
    StatusMismatch {
        /// Expected status
        expected: StatusCode,
        /// Actual status
        actual: StatusCode,
    },
    /// The request or response does not conform to the contract
    Validation(ValidationError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestBuild(msg) => write!(f, "Request build error: {msg}"),
            Self::BodyRead(msg) => write!(f, "Body read error: {msg}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Contract(msg) => write!(f, "Contract error: {msg}"),
            Self::Undocumented { method, path } => {
                write!(f, "`{method} {path}` is not documented in the contract")
            }
            Self::StatusMismatch { expected, actual } => {
                write!(f, "Expected status {expected}, got {actual}")
            }
            Self::Validation(e) => {
                write!(f, "{e}")?;
                for violation in e.violations() {
                    write!(f, "\n  - {violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for TestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<ValidationError> for TestError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}
