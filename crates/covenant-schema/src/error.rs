//! Contract loading errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a contract document.
#[derive(Error, Debug)]
pub enum ContractError {
    /// Failed to read the contract file.
    #[error("failed to read contract file: {path}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error.
    #[error("failed to parse JSON contract: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("failed to parse YAML contract: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required field is absent.
    #[error("missing required contract field: {field}")]
    MissingField {
        /// JSON pointer of the missing field.
        field: String,
    },

    /// A field has an unusable value.
    #[error("invalid contract at {location}: {reason}")]
    Invalid {
        /// JSON pointer of the offending value.
        location: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A local `$ref` does not point at anything.
    #[error("unresolved reference: {reference}")]
    UnresolvedRef {
        /// The reference string.
        reference: String,
    },
}
