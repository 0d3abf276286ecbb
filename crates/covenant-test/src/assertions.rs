//! Contract conformance assertions.

use std::path::Path;
use std::sync::Arc;

use covenant_core::{OperationResolver, RequestEnv, SchemaValidator, ValidatorOptions};
use covenant_middleware::ContractValidation;
use covenant_router::PathRouter;
use covenant_schema::{OpenApiDocument, OpenApiValidator};
use http::StatusCode;

use crate::error::TestError;
use crate::request::TestRequest;
use crate::response::TestResponse;

/// Checks recorded exchanges against a contract.
///
/// The `check_*` methods return the failure; the `assert_*` methods panic
/// with it, for use directly in test bodies.
///
/// # Example
///
/// ```
/// use covenant_test::{ContractAssertions, TestRequest, TestResponse};
/// use http::StatusCode;
/// use serde_json::json;
///
/// let contract = r#"
/// openapi: "3.0.3"
/// info: {title: Pets, version: "1"}
/// paths:
///   /pets/{id}:
///     get:
///       operationId: getPet
///       parameters:
///         - {name: id, in: path, required: true, schema: {type: integer}}
///       responses:
///         "200":
///           description: a pet
///           content:
///             application/json:
///               schema: {type: object, required: [name]}
/// "#;
///
/// let assertions = ContractAssertions::from_yaml(contract).unwrap();
/// let request = TestRequest::get("/pets/7").build().unwrap();
/// let response = TestResponse::json_body(StatusCode::OK, &json!({"name": "Rex"})).unwrap();
///
/// assertions.assert_schema_conform(&request, &response, StatusCode::OK);
/// ```
pub struct ContractAssertions<R = PathRouter, V = OpenApiValidator> {
    validation: Arc<ContractValidation<R, V>>,
}

impl ContractAssertions {
    /// Loads a contract file with default options.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TestError> {
        let document =
            OpenApiDocument::from_file(path).map_err(|e| TestError::Contract(e.to_string()))?;
        Self::from_document(&document, ValidatorOptions::default())
    }

    /// Loads a YAML contract with default options.
    pub fn from_yaml(yaml: &str) -> Result<Self, TestError> {
        let document =
            OpenApiDocument::from_yaml_str(yaml).map_err(|e| TestError::Contract(e.to_string()))?;
        Self::from_document(&document, ValidatorOptions::default())
    }

    /// Builds the default router and validator for a loaded document.
    pub fn from_document(
        document: &OpenApiDocument,
        options: ValidatorOptions,
    ) -> Result<Self, TestError> {
        let contract = document
            .to_contract()
            .map_err(|e| TestError::Contract(e.to_string()))?;
        let router = PathRouter::new(&contract).map_err(|e| TestError::Contract(e.to_string()))?;
        let validator = OpenApiValidator::for_document(document);
        Ok(Self::new(Arc::new(ContractValidation::new(
            router, validator, options,
        ))))
    }
}

impl<R, V> ContractAssertions<R, V>
where
    R: OperationResolver,
    V: SchemaValidator,
{
    /// Wraps an existing validation, e.g. the one a service runs with.
    pub fn new(validation: Arc<ContractValidation<R, V>>) -> Self {
        Self { validation }
    }

    /// Validates the request and returns the environment it produced.
    ///
    /// Unlike the middleware, an undocumented request is an error here.
    pub fn check_request(&self, request: &TestRequest) -> Result<RequestEnv, TestError> {
        let exchange = self.validation.exchange(&request.method, request.path());
        if !exchange.is_matched() {
            return Err(undocumented(request));
        }

        let mut env = RequestEnv::new();
        exchange.validate_request(&mut env, &request.to_raw_request())?;
        Ok(env)
    }

    /// Validates the response the request received.
    pub fn check_response(
        &self,
        request: &TestRequest,
        response: &TestResponse,
        strict: bool,
    ) -> Result<(), TestError> {
        let exchange = self.validation.exchange(&request.method, request.path());
        if !exchange.is_matched() {
            return Err(undocumented(request));
        }

        exchange.validate_response(
            response.status(),
            response.headers(),
            &response.buffer(),
            strict,
        )?;
        Ok(())
    }

    /// Checks the status, then the request, then the response in strict
    /// mode.
    pub fn check_schema_conform(
        &self,
        request: &TestRequest,
        response: &TestResponse,
        expected_status: StatusCode,
    ) -> Result<RequestEnv, TestError> {
        if response.status() != expected_status {
            return Err(TestError::StatusMismatch {
                expected: expected_status,
                actual: response.status(),
            });
        }

        let env = self.check_request(request)?;
        self.check_response(request, response, true)?;
        Ok(env)
    }

    /// Panics unless the exchange conforms and has the expected status.
    #[track_caller]
    pub fn assert_schema_conform(
        &self,
        request: &TestRequest,
        response: &TestResponse,
        expected_status: StatusCode,
    ) {
        if let Err(e) = self.check_schema_conform(request, response, expected_status) {
            panic!("{e}");
        }
    }

    /// Panics unless the request conforms.
    #[track_caller]
    pub fn assert_request_conform(&self, request: &TestRequest) {
        if let Err(e) = self.check_request(request) {
            panic!("{e}");
        }
    }

    /// Panics unless the response conforms.
    #[track_caller]
    pub fn assert_response_conform(
        &self,
        request: &TestRequest,
        response: &TestResponse,
        strict: bool,
    ) {
        if let Err(e) = self.check_response(request, response, strict) {
            panic!("{e}");
        }
    }
}

fn undocumented(request: &TestRequest) -> TestError {
    TestError::Undocumented {
        method: request.method.clone(),
        path: request.path().to_string(),
    }
}
