//! # Covenant Router
//!
//! Maps `(method, path)` pairs to contract operations.
//!
//! [`PathRouter`] compiles every path template of a [`Contract`] to a regular
//! expression, orders templates so that literal segments win over
//! parameters, and converts the captured segments to their declared types.
//!
//! ```
//! use covenant_core::{Contract, Operation, OperationResolver};
//! use covenant_router::PathRouter;
//! use http::Method;
//!
//! let contract = Contract::new(
//!     "Pets",
//!     "1.0.0",
//!     vec![Operation::new("getPet", Method::GET, "/pets/{id}")],
//! );
//! let router = PathRouter::new(&contract).unwrap();
//! let matched = router.resolve(&Method::GET, "/pets/42").unwrap();
//! assert_eq!(matched.operation_id(), "getPet");
//! assert_eq!(matched.path_param("id"), Some("42"));
//! ```
//!
//! [`Contract`]: covenant_core::Contract

#![doc(html_root_url = "https://docs.rs/covenant-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod resolver;

pub use error::RouterError;
pub use resolver::PathRouter;
