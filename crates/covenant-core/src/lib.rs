//! # Covenant Core
//!
//! Core types and traits for OpenAPI contract validation.
//!
//! This crate provides the foundational types used throughout Covenant:
//!
//! - [`Operation`] / [`Contract`] - Read-only operation descriptors loaded from a contract
//! - [`ParameterSet`] / [`HeaderSet`] - Request-local parameter and header mappings
//! - [`RequestEnv`] - Per-request storage slots written by the orchestrator
//! - [`ValidatorOptions`] - Immutable per-validator configuration
//! - [`ValidationError`] - The terminal error of a validated exchange
//! - [`OperationResolver`] / [`SchemaValidator`] - Collaborator seams

#![doc(html_root_url = "https://docs.rs/covenant-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod coerce;
mod contract;
mod env;
mod error;
mod operation;
mod options;
mod params;

pub use contract::{
    OperationMatch, OperationResolver, RawPathParams, ResponseData, SchemaValidator,
    UnpackedBody,
};
pub use env::{EnvValue, RequestEnv};
pub use error::{ContractPart, ValidationError, ValidationResult, Violation};
pub use operation::{
    Contract, Operation, ParameterLocation, ParameterSpec, ParameterStyle, RequestBodySpec,
    ResponseHeaderSpec, ResponseKey, ResponseSpec,
};
pub use options::ValidatorOptions;
pub use params::{HeaderSet, ParameterSet};
