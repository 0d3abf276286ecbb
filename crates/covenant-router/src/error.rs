//! Router construction errors.

use thiserror::Error;

/// Errors raised while compiling a contract's path templates.
#[derive(Error, Debug)]
pub enum RouterError {
    /// A template has an unterminated or empty `{}` placeholder.
    #[error("invalid path template '{template}': {reason}")]
    InvalidTemplate {
        /// The offending template.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The compiled pattern was rejected by the regex engine.
    #[error("failed to compile path template '{template}'")]
    Pattern {
        /// The offending template.
        template: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
}
