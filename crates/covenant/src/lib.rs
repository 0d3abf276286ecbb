//! # Covenant
//!
//! **OpenAPI 3 contract validation for HTTP services**
//!
//! Covenant checks every exchange against an OpenAPI document:
//!
//! - **Request validation** – path values coerced to their declared types,
//!   query, body and headers unpacked and merged, then validated
//! - **Response validation** – bodies drained and parsed by content type,
//!   then validated, leniently or strictly
//! - **Request environment** – coerced parameters stored under configurable
//!   keys for handlers to read
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use covenant::prelude::*;
//!
//! let config = ConfigLoader::new()
//!     .with_file("covenant.toml")?
//!     .with_env_prefix("COVENANT")
//!     .load()?;
//! covenant::init_logging(&config)?;
//!
//! let pipeline = Covenant::from_config(&config)?.pipeline();
//! let (response, ctx) = pipeline.process(MiddlewareContext::new(), request, handler).await;
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! Request → RequestValidation → ResponseValidation → Handler
//!                                                       ↓
//! Response ←──────── ResponseValidation ←───────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/covenant/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod setup;

pub use setup::{init_logging, Covenant, DefaultValidation, SetupError};

// Re-export core types
pub use covenant_core as core;

// Re-export the default resolver
pub use covenant_router as router;

// Re-export contract loading and schema validation
pub use covenant_schema as schema;

// Re-export parameter unpacking
pub use covenant_extract as extract;

// Re-export the orchestrator and stages
pub use covenant_middleware as middleware;

// Re-export configuration
pub use covenant_config as config;

// Re-export logging and metrics
pub use covenant_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use covenant::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Covenant, SetupError};

    pub use covenant_core::{
        OperationMatch, OperationResolver, ParameterSet, RequestEnv, SchemaValidator,
        ValidationError, ValidatorOptions, Violation,
    };

    pub use covenant_config::{ConfigLoader, CovenantConfig};

    pub use covenant_extract::RawRequest;

    pub use covenant_middleware::{
        ContractValidation, Middleware, MiddlewareContext, Next, Pipeline,
        RequestValidationMiddleware, ResponseBuffer, ResponseExt, ResponseValidationMiddleware,
    };

    pub use covenant_router::PathRouter;

    pub use covenant_schema::{OpenApiDocument, OpenApiValidator};
}
