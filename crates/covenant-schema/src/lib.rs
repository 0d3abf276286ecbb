//! # Covenant Schema
//!
//! OpenAPI 3 contract loading and schema validation.
//!
//! - [`OpenApiDocument`] parses a JSON or YAML document and builds a
//!   [`Contract`](covenant_core::Contract), resolving local `$ref`s and
//!   OpenAPI 3.0 `nullable`.
//! - [`OpenApiValidator`] implements
//!   [`SchemaValidator`](covenant_core::SchemaValidator) on top of
//!   `jsonschema`, caching compiled schemas per operation.

#![doc(html_root_url = "https://docs.rs/covenant-schema/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod document;
mod error;
mod validator;

pub use document::{OpenApiDocument, SchemaDialect};
pub use error::ContractError;
pub use validator::OpenApiValidator;
