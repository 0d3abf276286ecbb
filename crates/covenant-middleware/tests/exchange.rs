//! Exchange-level tests running the orchestrator against a loaded contract
//! with the default router and schema validator.

use std::collections::BTreeMap;

use bytes::Bytes;
use covenant_core::{ContractPart, ParameterSet, RequestEnv, ValidationError, ValidatorOptions};
use covenant_extract::RawRequest;
use covenant_middleware::{ContractValidation, ResponseBuffer};
use covenant_router::PathRouter;
use covenant_schema::{OpenApiDocument, OpenApiValidator};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use proptest::prelude::*;
use serde_json::{json, Value};

const PETSTORE: &str = r#"{
  "openapi": "3.0.3",
  "info": {"title": "Petstore", "version": "1.0.0"},
  "paths": {
    "/pets": {
      "post": {
        "operationId": "createPet",
        "parameters": [
          {"name": "tag", "in": "query", "schema": {"type": "string"}}
        ],
        "requestBody": {
          "required": true,
          "content": {
            "application/json": {
              "schema": {
                "type": "object",
                "required": ["name"],
                "additionalProperties": false,
                "properties": {
                  "name": {"type": "string"},
                  "tag": {"type": "string", "maxLength": 3}
                }
              }
            }
          }
        },
        "responses": {"201": {"description": "created"}}
      }
    },
    "/pets/{id}": {
      "get": {
        "operationId": "getPet",
        "parameters": [
          {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}},
          {"name": "limit", "in": "query", "schema": {"type": "integer"}}
        ],
        "responses": {
          "200": {
            "description": "a pet",
            "content": {
              "application/json": {
                "schema": {
                  "type": "object",
                  "required": ["name"],
                  "properties": {"name": {"type": "string"}}
                }
              }
            }
          }
        }
      }
    }
  }
}"#;

type Validation = ContractValidation<PathRouter, OpenApiValidator>;

fn validation(options: ValidatorOptions) -> Validation {
    let document = OpenApiDocument::from_json_str(PETSTORE).unwrap();
    let contract = document.to_contract().unwrap();
    let router = PathRouter::new(&contract).unwrap();
    ContractValidation::new(router, OpenApiValidator::for_document(&document), options)
}

fn get(uri: &str) -> RawRequest {
    RawRequest::builder().method(Method::GET).uri(uri).build()
}

fn headers(content_type: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers
}

fn validate_get(validation: &Validation, uri: &str, env: &mut RequestEnv) -> Result<(), ValidationError> {
    let request = get(uri);
    validation
        .exchange(request.method(), request.path())
        .validate_request(env, &request)
}

#[test]
fn integer_path_param_is_coerced() {
    let validation = validation(ValidatorOptions::default());
    let mut env = RequestEnv::new();

    validate_get(&validation, "/pets/42", &mut env).unwrap();

    let options = validation.options();
    assert_eq!(env.params(&options.path_hash_key).unwrap().get("id"), Some(&json!(42)));
    let params = env.params(&options.params_key).unwrap();
    assert_eq!(params.get("id"), Some(&json!(42)));
    assert_eq!(params.len(), 1);
}

#[test]
fn uncoercible_path_param_is_a_request_violation() {
    let validation = validation(ValidatorOptions::default());
    let mut env = RequestEnv::new();

    let err = validate_get(&validation, "/pets/abc", &mut env).unwrap_err();

    assert!(matches!(
        &err,
        ValidationError::Coercion { parameter, value, .. } if parameter == "id" && value == "abc"
    ));
    assert!(err.is_request_side());
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[test]
fn path_value_wins_over_query_value() {
    let validation = validation(ValidatorOptions::default());
    let mut env = RequestEnv::new();

    validate_get(&validation, "/pets/7?id=99&limit=3", &mut env).unwrap();

    let params = env.params(&validation.options().params_key).unwrap();
    assert_eq!(params.get("id"), Some(&json!(7)));
    assert_eq!(params.get("limit"), Some(&json!(3)));
}

#[test]
fn invalid_query_value_is_reported() {
    let validation = validation(ValidatorOptions::default());
    let mut env = RequestEnv::new();

    let err = validate_get(&validation, "/pets/7?limit=lots", &mut env).unwrap_err();

    let violations = err.violations();
    assert!(matches!(err, ValidationError::Request { .. }));
    assert!(violations.iter().any(|v| v.part == ContractPart::Query));
}

#[test]
fn unmatched_request_is_inert() {
    let validation = validation(ValidatorOptions::default());
    let exchange = validation.exchange(&Method::GET, "/health");
    let mut env = RequestEnv::new();

    exchange.validate_request(&mut env, &get("/health?verbose=1")).unwrap();
    exchange
        .validate_response(
            StatusCode::OK,
            &headers("application/json"),
            &ResponseBuffer::from_bytes("not json at all"),
            true,
        )
        .unwrap();

    let options = validation.options();
    assert!(!env.contains_key(&options.path_hash_key));
    assert!(!env.contains_key(&options.params_key));
}

#[test]
fn required_body_must_be_sent() {
    let validation = validation(ValidatorOptions::default());
    let request = RawRequest::builder()
        .method(Method::POST)
        .uri("/pets")
        .header("content-type", "application/json")
        .build();
    let mut env = RequestEnv::new();

    let err = validation
        .exchange(&Method::POST, "/pets")
        .validate_request(&mut env, &request)
        .unwrap_err();

    assert!(err.violations().iter().any(|v| v.part == ContractPart::RequestBody));
}

#[test]
fn malformed_json_body_is_rejected() {
    let validation = validation(ValidatorOptions::default());
    let request = RawRequest::builder()
        .method(Method::POST)
        .uri("/pets")
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .build();
    let mut env = RequestEnv::new();

    let err = validation
        .exchange(&Method::POST, "/pets")
        .validate_request(&mut env, &request)
        .unwrap_err();

    assert!(matches!(err, ValidationError::RequestMalformed { .. }));
}

#[test]
fn json_body_is_validated() {
    let validation = validation(ValidatorOptions::default());
    let exchange = validation.exchange(&Method::POST, "/pets");

    let ok = RawRequest::builder()
        .method(Method::POST)
        .uri("/pets")
        .header("content-type", "application/json")
        .body(r#"{"name":"Rex"}"#)
        .build();
    exchange.validate_request(&mut RequestEnv::new(), &ok).unwrap();

    let wrong_type = RawRequest::builder()
        .method(Method::POST)
        .uri("/pets")
        .header("content-type", "application/json")
        .body(r#"{"name":7}"#)
        .build();
    let err = exchange
        .validate_request(&mut RequestEnv::new(), &wrong_type)
        .unwrap_err();
    assert!(err.violations().iter().any(|v| v.part == ContractPart::RequestBody));
}

fn post_pets(uri: &str, body: &'static str) -> RawRequest {
    RawRequest::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("content-length", &body.len().to_string())
        .body(body)
        .build()
}

#[test]
fn empty_json_object_must_satisfy_body_schema() {
    let validation = validation(ValidatorOptions::default());
    let request = post_pets("/pets", "{}");

    let err = validation
        .exchange(&Method::POST, "/pets")
        .validate_request(&mut RequestEnv::new(), &request)
        .unwrap_err();

    let violations = err.violations();
    assert!(matches!(err, ValidationError::Request { .. }));
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].part, ContractPart::RequestBody);
    assert!(violations[0].message.contains("name"));
}

#[test]
fn query_keys_are_not_body_fields() {
    let validation = validation(ValidatorOptions::default());
    let request = post_pets("/pets?trace=1", r#"{"name":"Rex"}"#);
    let mut env = RequestEnv::new();

    validation
        .exchange(&Method::POST, "/pets")
        .validate_request(&mut env, &request)
        .unwrap();

    let params = env.params(&validation.options().params_key).unwrap();
    assert_eq!(params.get("trace"), Some(&json!("1")));
    assert_eq!(params.get("name"), Some(&json!("Rex")));
}

#[test]
fn body_field_named_like_query_param_is_checked_by_body_schema() {
    let validation = validation(ValidatorOptions::default());
    let request = post_pets("/pets", r#"{"name":"Rex","tag":"puppy"}"#);

    let err = validation
        .exchange(&Method::POST, "/pets")
        .validate_request(&mut RequestEnv::new(), &request)
        .unwrap_err();

    assert!(err
        .violations()
        .iter()
        .any(|v| v.part == ContractPart::RequestBody && v.pointer == "/tag"));
}

#[test]
fn response_body_must_carry_required_property() {
    let validation = validation(ValidatorOptions::default());
    let exchange = validation.exchange(&Method::GET, "/pets/1");
    let json = headers("application/json");

    let err = exchange
        .validate_response(StatusCode::OK, &json, &ResponseBuffer::from_bytes("{}"), false)
        .unwrap_err();
    assert!(matches!(err, ValidationError::Response { status: 200, .. }));
    assert!(err.violations().iter().any(|v| v.part == ContractPart::ResponseBody));

    exchange
        .validate_response(
            StatusCode::OK,
            &json,
            &ResponseBuffer::from_bytes(r#"{"name":"Rex"}"#),
            false,
        )
        .unwrap();
}

#[test]
fn empty_json_response_is_validated_as_empty_object() {
    let validation = validation(ValidatorOptions::default());
    let exchange = validation.exchange(&Method::GET, "/pets/1");

    let err = exchange
        .validate_response(
            StatusCode::OK,
            &headers("application/json; charset=utf-8"),
            &ResponseBuffer::default(),
            false,
        )
        .unwrap_err();

    // a schema violation, not a decode failure
    assert!(matches!(err, ValidationError::Response { .. }));
}

#[test]
fn non_json_response_is_not_parsed() {
    let validation = validation(ValidatorOptions::default());
    let exchange = validation.exchange(&Method::GET, "/pets/1");

    exchange
        .validate_response(
            StatusCode::OK,
            &headers("text/plain"),
            &ResponseBuffer::from_bytes("{}"),
            false,
        )
        .unwrap();
}

#[test]
fn malformed_json_response_is_reported() {
    let validation = validation(ValidatorOptions::default());
    let exchange = validation.exchange(&Method::GET, "/pets/1");

    let err = exchange
        .validate_response(
            StatusCode::OK,
            &headers("application/json"),
            &ResponseBuffer::from_bytes("{\"name\""),
            false,
        )
        .unwrap_err();
    assert!(matches!(err, ValidationError::ResponseMalformed { status: 200, .. }));
}

#[test]
fn strict_mode_rejects_undeclared_status() {
    let validation = validation(ValidatorOptions::default());
    let exchange = validation.exchange(&Method::GET, "/pets/1");
    let body = ResponseBuffer::from_bytes(r#"{"message":"not found"}"#);
    let json = headers("application/json");

    exchange
        .validate_response(StatusCode::NOT_FOUND, &json, &body, false)
        .unwrap();

    let err = exchange
        .validate_response(StatusCode::NOT_FOUND, &json, &body, true)
        .unwrap_err();
    let violations = err.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].part, ContractPart::ResponseStatus);
    assert!(violations[0].message.contains("404"));
}

#[test]
fn drained_stream_feeds_response_validation() {
    let validation = validation(ValidatorOptions::default());
    let exchange = validation.exchange(&Method::GET, "/pets/1");

    let chunks: Vec<Result<Bytes, std::convert::Infallible>> = vec![
        Ok(Bytes::from_static(b"{\"na")),
        Ok(Bytes::from_static(b"me\":\"Rex\"}")),
    ];
    let buffer =
        tokio_test::block_on(ResponseBuffer::drain_stream(futures_util::stream::iter(chunks)))
            .unwrap();

    exchange
        .validate_response(StatusCode::OK, &headers("application/json"), &buffer, true)
        .unwrap();
}

proptest! {
    #[test]
    fn query_unpacking_is_idempotent(
        pairs in prop::collection::btree_map("x[a-z]{0,6}", "[a-z0-9]{0,6}", 0..6)
    ) {
        let validation = validation(ValidatorOptions::default());
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let uri = format!("/pets/1?{query}");

        let mut first = RequestEnv::new();
        let mut second = RequestEnv::new();
        validate_get(&validation, &uri, &mut first).unwrap();
        validate_get(&validation, &uri, &mut second).unwrap();

        let key = &validation.options().params_key;
        prop_assert_eq!(first.params(key), second.params(key));
    }

    #[test]
    fn echo_keeps_native_key_set(
        pairs in prop::collection::btree_map("x[a-z]{0,6}", "[a-z0-9]{0,6}", 1..6),
        limit in 0i64..1000,
    ) {
        let validation = validation(ValidatorOptions::default());

        let mut all: BTreeMap<String, String> = pairs.clone();
        all.insert("limit".to_string(), limit.to_string());
        let query = all
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let native: ParameterSet = all
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let mut env = RequestEnv::with_native_query(native);

        validate_get(&validation, &format!("/pets/5?{query}"), &mut env).unwrap();

        let echoed = env
            .params(validation.options().query_hash_key.as_deref().unwrap())
            .unwrap();
        let echoed_keys: Vec<&str> = echoed.keys().collect();
        let native_keys: Vec<&str> = all.keys().map(String::as_str).collect();
        prop_assert_eq!(&echoed_keys, &native_keys);
        prop_assert_eq!(echoed.get("limit"), Some(&json!(limit)));

        let upgraded = env.native_query().unwrap();
        prop_assert_eq!(upgraded.keys().collect::<Vec<_>>(), native_keys);
        prop_assert_eq!(upgraded.get("limit"), Some(&json!(limit)));
        for (k, v) in &pairs {
            prop_assert_eq!(echoed.get(k), Some(&Value::String(v.clone())));
        }
    }
}
