//! Validator options.

use serde::{Deserialize, Serialize};

/// Immutable options controlling one validator instance.
///
/// The storage keys name the [`RequestEnv`](crate::RequestEnv) slots the
/// orchestrator writes to, so that downstream handlers can read the merged
/// parameters, headers, and path parameters after validation.
///
/// # Example
///
/// ```
/// use covenant_core::ValidatorOptions;
///
/// let options = ValidatorOptions {
///     allow_get_body: true,
///     ..ValidatorOptions::default()
/// };
/// assert!(options.coerce_path_params);
/// assert_eq!(options.params_key, "covenant.params");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Coerce path values to their declared types before merging.
    pub coerce_path_params: bool,
    /// Coerce query values to their declared types during validation.
    pub coerce_query_params: bool,
    /// Coerce form body values to their declared types during validation.
    pub coerce_form_params: bool,
    /// Decode `application/x-www-form-urlencoded` bodies.
    pub allow_form_params: bool,
    /// Decode bodies of GET and HEAD requests.
    pub allow_get_body: bool,
    /// Decode the query string.
    pub allow_query_params: bool,
    /// Try to decode bodies as JSON whatever their `Content-Type`.
    pub optimistic_json: bool,
    /// Only parse response bodies as JSON when the response says it is JSON.
    pub parse_response_by_content_type: bool,
    /// Reject request `Content-Type` values the operation does not declare.
    pub check_content_type: bool,
    /// Validate declared header parameters.
    pub check_header: bool,
    /// Skip response validation for non-2xx statuses.
    pub validate_success_only: bool,
    /// Slot holding the merged request parameters.
    pub params_key: String,
    /// Slot holding the request headers.
    pub headers_key: String,
    /// Slot holding the path parameters.
    pub path_hash_key: String,
    /// Slot receiving coerced values for keys of the native query hash.
    /// `None` disables the echo.
    pub query_hash_key: Option<String>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            coerce_path_params: true,
            coerce_query_params: true,
            coerce_form_params: true,
            allow_form_params: true,
            allow_get_body: false,
            allow_query_params: true,
            optimistic_json: false,
            parse_response_by_content_type: true,
            check_content_type: true,
            check_header: true,
            validate_success_only: false,
            params_key: "covenant.params".to_string(),
            headers_key: "covenant.headers".to_string(),
            path_hash_key: "covenant.path_params".to_string(),
            query_hash_key: Some("covenant.query_hash".to_string()),
        }
    }
}

impl ValidatorOptions {
    /// Options that accept as much as possible: optimistic JSON, GET bodies,
    /// no content-type or header checks.
    pub fn permissive() -> Self {
        Self {
            allow_get_body: true,
            optimistic_json: true,
            check_content_type: false,
            check_header: false,
            ..Self::default()
        }
    }

    /// The storage keys in use, `query_hash_key` included when set.
    pub fn storage_keys(&self) -> Vec<&str> {
        let mut keys = vec![
            self.params_key.as_str(),
            self.headers_key.as_str(),
            self.path_hash_key.as_str(),
        ];
        if let Some(key) = self.query_hash_key.as_deref() {
            keys.push(key);
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ValidatorOptions::default();
        assert!(options.coerce_path_params);
        assert!(options.allow_form_params);
        assert!(!options.allow_get_body);
        assert!(options.allow_query_params);
        assert!(!options.optimistic_json);
        assert!(options.parse_response_by_content_type);
        assert_eq!(options.query_hash_key.as_deref(), Some("covenant.query_hash"));
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let options: ValidatorOptions =
            serde_json::from_str(r#"{"allow_get_body": true, "query_hash_key": null}"#).unwrap();
        assert!(options.allow_get_body);
        assert!(options.query_hash_key.is_none());
        assert_eq!(options.params_key, "covenant.params");
    }

    #[test]
    fn test_storage_keys() {
        let options = ValidatorOptions::default();
        assert_eq!(options.storage_keys().len(), 4);
        let options = ValidatorOptions {
            query_hash_key: None,
            ..ValidatorOptions::default()
        };
        assert_eq!(options.storage_keys().len(), 3);
    }
}
