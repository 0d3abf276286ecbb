//! Middleware stages.
//!
//! - [`RequestValidationMiddleware`] validates requests before the handler
//! - [`ResponseValidationMiddleware`] validates responses after the handler

pub mod validation;

pub use validation::{RequestValidationMiddleware, ResponseValidationMiddleware};
