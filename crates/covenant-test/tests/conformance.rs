//! Conformance assertions against a small contract.

use covenant_test::{ContractAssertions, TestError, TestRequest, TestResponse};
use http::{HeaderMap, StatusCode};
use serde_json::json;
use std::io::Write;

const CONTRACT: &str = r#"
openapi: "3.0.3"
info:
  title: Petstore
  version: "1.0.0"
paths:
  /pets:
    post:
      operationId: createPet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name: {type: string}
      responses:
        "201":
          description: created
          content:
            application/json:
              schema:
                type: object
                required: [id]
                properties:
                  id: {type: integer}
  /pets/{id}:
    get:
      operationId: getPet
      parameters:
        - name: id
          in: path
          required: true
          schema: {type: integer}
        - name: limit
          in: query
          schema: {type: integer}
      responses:
        "200":
          description: a pet
          content:
            application/json:
              schema:
                type: object
                required: [name]
                properties:
                  name: {type: string}
        default:
          description: error
"#;

fn assertions() -> ContractAssertions {
    ContractAssertions::from_yaml(CONTRACT).unwrap()
}

fn pet(status: StatusCode) -> TestResponse {
    TestResponse::json_body(status, &json!({"name": "Rex"})).unwrap()
}

#[test]
fn conforming_exchange_passes() {
    let request = TestRequest::get("/pets/3").query("limit", "10").build().unwrap();
    let env = assertions()
        .check_schema_conform(&request, &pet(StatusCode::OK), StatusCode::OK)
        .unwrap();

    let params = env.params("covenant.params").unwrap();
    assert_eq!(params.get("id"), Some(&json!(3)));
    assert_eq!(params.get("limit"), Some(&json!(10)));
}

#[test]
fn conforming_post_passes() {
    let request = TestRequest::post("/pets")
        .json(&json!({"name": "Rex"}))
        .build()
        .unwrap();
    let response = TestResponse::json_body(StatusCode::CREATED, &json!({"id": 1})).unwrap();
    assertions().assert_schema_conform(&request, &response, StatusCode::CREATED);
}

#[test]
fn status_is_checked_first() {
    let request = TestRequest::get("/pets/abc").build().unwrap();
    let result = assertions().check_schema_conform(
        &request,
        &pet(StatusCode::OK),
        StatusCode::CREATED,
    );
    assert!(matches!(
        result,
        Err(TestError::StatusMismatch {
            expected: StatusCode::CREATED,
            actual: StatusCode::OK,
        })
    ));
}

#[test]
fn undocumented_route_is_an_error() {
    let request = TestRequest::get("/health").build().unwrap();
    let err = assertions().check_request(&request).unwrap_err();
    assert!(matches!(err, TestError::Undocumented { .. }));
    assert!(err.to_string().contains("GET /health"));
}

#[test]
fn nonconforming_request_is_reported() {
    let request = TestRequest::post("/pets")
        .json(&json!({"name": 7}))
        .build()
        .unwrap();
    let err = assertions().check_request(&request).unwrap_err();
    let TestError::Validation(inner) = err else {
        panic!("expected a validation error");
    };
    assert_eq!(inner.error_code(), "REQUEST_VALIDATION_FAILED");
}

#[test]
fn strict_mode_rejects_undeclared_status() {
    // 404 only matches `default`, which strict mode does not accept.
    let request = TestRequest::get("/pets/3").build().unwrap();
    let response = TestResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), "");

    assert!(assertions().check_response(&request, &response, false).is_ok());
    assert!(assertions().check_response(&request, &response, true).is_err());
}

#[test]
#[should_panic(expected = "response validation failed")]
fn assert_panics_on_nonconforming_response() {
    let request = TestRequest::get("/pets/3").build().unwrap();
    let response = TestResponse::json_body(StatusCode::OK, &json!({})).unwrap();
    assertions().assert_schema_conform(&request, &response, StatusCode::OK);
}

#[test]
fn loads_contract_from_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(CONTRACT.as_bytes()).unwrap();
    file.flush().unwrap();

    let assertions = ContractAssertions::from_file(file.path()).unwrap();
    let request = TestRequest::get("/pets/1").build().unwrap();
    assertions.assert_request_conform(&request);
}
