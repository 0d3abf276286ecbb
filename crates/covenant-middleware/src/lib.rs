//! # Covenant Middleware
//!
//! The validation orchestrator and the middleware that runs it in front of
//! handlers.
//!
//! ## Exchange flow
//!
//! ```text
//! Request → resolve operation ──none──→ pass through
//!               │
//!               ▼
//!     coerce path params → unpack query, body, headers
//!               │
//!               ▼
//!     merge (query ← body ← path) → validate request → echo to query hash
//!               │
//!            Handler
//!               │
//!               ▼
//!     drain body → parse by content type → validate response
//! ```
//!
//! [`ContractValidation`] does the work and never logs. The stages in
//! [`stages`] wrap it, log outcomes, record metrics, and turn failures into
//! JSON error responses.
//!
//! ## Example
//!
//! ```
//! use covenant_middleware::{MiddlewareContext, Pipeline};
//!
//! let pipeline = Pipeline::builder().build();
//! assert_eq!(pipeline.stage_count(), 0);
//!
//! let ctx = MiddlewareContext::new();
//! assert!(ctx.operation_id().is_none());
//! ```

#![doc(html_root_url = "https://docs.rs/covenant-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod drain;
pub mod middleware;
pub mod orchestrator;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use context::MiddlewareContext;
pub use drain::ResponseBuffer;
pub use middleware::{BoxFuture, Middleware, Next};
pub use orchestrator::{response_data, ContractValidation, Exchange};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use stages::{RequestValidationMiddleware, ResponseValidationMiddleware};
pub use types::{Request, Response, ResponseExt};
