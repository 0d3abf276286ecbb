//! # Covenant Test
//!
//! Contract conformance assertions for service tests.
//!
//! Build a [`TestRequest`], get a [`TestResponse`] from the service however
//! the test drives it, and let [`ContractAssertions`] check both against the
//! OpenAPI document:
//!
//! ```ignore
//! use covenant_test::{ContractAssertions, TestRequest, TestResponse};
//!
//! let assertions = ContractAssertions::from_file("openapi.yaml")?;
//!
//! let request = TestRequest::post("/pets").json(&json!({"name": "Rex"})).build()?;
//! let response = TestResponse::from_http(app.call(request.clone().into_http_request()).await).await?;
//!
//! assertions.assert_schema_conform(&request, &response, StatusCode::CREATED);
//! ```
//!
//! `assert_schema_conform` checks the status first, then validates the
//! request, then validates the response in strict mode: the status must be
//! declared exactly and the media type must match.

#![doc(html_root_url = "https://docs.rs/covenant-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assertions;
mod error;
mod request;
mod response;

pub use assertions::ContractAssertions;
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
