//! # Covenant Extract
//!
//! Unpacks raw HTTP requests into the parameter and header mappings the
//! schema validator consumes.
//!
//! | Operation | Source | Result |
//! |-----------|--------|--------|
//! | [`ParameterUnpacker::unpack_query_params`] | Query string | [`ParameterSet`](covenant_core::ParameterSet) of strings and arrays |
//! | [`ParameterUnpacker::unpack_request_params`] | Request body | JSON object or form fields, plus a form flag |
//! | [`ParameterUnpacker::unpack_body`] | Request body | As above, or `None` when nothing was decoded |
//! | [`ParameterUnpacker::unpack_headers`] | Headers | [`HeaderSet`](covenant_core::HeaderSet) |
//!
//! ## Example
//!
//! ```rust
//! use covenant_extract::{ParameterUnpacker, RawRequest, UnpackOptions};
//! use http::Method;
//!
//! let request = RawRequest::builder()
//!     .method(Method::POST)
//!     .uri("/pets?limit=10")
//!     .header("content-type", "application/json")
//!     .body(r#"{"name": "Rex"}"#)
//!     .build();
//!
//! let unpacker = ParameterUnpacker::new(UnpackOptions::default());
//! let query = unpacker.unpack_query_params(&request);
//! let (body, is_form) = unpacker.unpack_request_params(&request).unwrap();
//!
//! assert_eq!(query.get("limit"), Some(&serde_json::json!("10")));
//! assert_eq!(body.get("name"), Some(&serde_json::json!("Rex")));
//! assert!(!is_form);
//! ```

#![doc(html_root_url = "https://docs.rs/covenant-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod request;
mod unpacker;

pub use error::{UnpackError, UnpackSource};
pub use request::{RawRequest, RawRequestBuilder};
pub use unpacker::{ParameterUnpacker, UnpackOptions};
