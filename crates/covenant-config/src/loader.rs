//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! defaults, files, and environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use covenant_telemetry::LogFormat;

use crate::{ConfigError, CovenantConfig};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use covenant_config::ConfigLoader;
///
/// # fn main() -> Result<(), covenant_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("covenant.toml")?
///     .with_env_prefix("COVENANT")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: CovenantConfig,
    env_prefix: Option<String>,
    file_loaded: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CovenantConfig::default(),
            env_prefix: None,
            file_loaded: false,
        }
    }

    /// Start with default configuration values.
    ///
    /// This is what `new()` does, but can be chained for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = CovenantConfig::default();
        self
    }

    /// Start with the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = CovenantConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = CovenantConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is picked from the extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let file_config = Self::parse_file(&content, path)?;
        self.merge_config(file_config);
        self.file_loaded = true;

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or
    /// `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use covenant_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [contract]
    ///     path = "openapi.yaml"
    ///
    ///     [response]
    ///     enforce = true
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.response.enforce);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let file_config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };

        self.merge_config(file_config);
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, for example
    /// `COVENANT__CONTRACT__PATH` or
    /// `COVENANT__VALIDATION__OPTIONS__ALLOW_GET_BODY`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if one exists.
    ///
    /// # Errors
    ///
    /// Never fails today; a missing or unreadable `.env` is skipped.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Ok(self)
    }

    /// Whether a configuration file was loaded.
    pub fn file_loaded(&self) -> bool {
        self.file_loaded
    }

    /// Apply environment overrides, validate, and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable cannot be parsed or
    /// the final configuration is invalid.
    pub fn load(mut self) -> Result<CovenantConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> CovenantConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<CovenantConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    // Sections absent from the file keep their defaults through serde, so a
    // full replace is enough.
    fn merge_config(&mut self, file_config: CovenantConfig) {
        self.config = file_config;
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut env_vars: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
        env_vars.sort();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let options = &mut self.config.validation.options;

        match parts.as_slice() {
            // Contract section
            ["CONTRACT", "PATH"] => {
                self.config.contract.path = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }

            // Validation section
            ["VALIDATION", "ENABLED"] => {
                self.config.validation.enabled = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "COERCE_PATH_PARAMS"] => {
                options.coerce_path_params = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "COERCE_QUERY_PARAMS"] => {
                options.coerce_query_params = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "COERCE_FORM_PARAMS"] => {
                options.coerce_form_params = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "ALLOW_FORM_PARAMS"] => {
                options.allow_form_params = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "ALLOW_GET_BODY"] => {
                options.allow_get_body = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "ALLOW_QUERY_PARAMS"] => {
                options.allow_query_params = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "OPTIMISTIC_JSON"] => {
                options.optimistic_json = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "PARSE_RESPONSE_BY_CONTENT_TYPE"] => {
                options.parse_response_by_content_type = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "CHECK_CONTENT_TYPE"] => {
                options.check_content_type = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "CHECK_HEADER"] => {
                options.check_header = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "VALIDATE_SUCCESS_ONLY"] => {
                options.validate_success_only = env_bool(key, value)?;
            }
            ["VALIDATION", "OPTIONS", "PARAMS_KEY"] => {
                options.params_key = value.to_string();
            }
            ["VALIDATION", "OPTIONS", "HEADERS_KEY"] => {
                options.headers_key = value.to_string();
            }
            ["VALIDATION", "OPTIONS", "PATH_HASH_KEY"] => {
                options.path_hash_key = value.to_string();
            }
            ["VALIDATION", "OPTIONS", "QUERY_HASH_KEY"] => {
                // Empty or "none" turns the echo off.
                options.query_hash_key =
                    if value.is_empty() || value.eq_ignore_ascii_case("none") {
                        None
                    } else {
                        Some(value.to_string())
                    };
            }

            // Response section
            ["RESPONSE", "ENABLED"] => {
                self.config.response.enabled = env_bool(key, value)?;
            }
            ["RESPONSE", "ENFORCE"] => {
                self.config.response.enforce = env_bool(key, value)?;
            }
            ["RESPONSE", "STRICT"] => {
                self.config.response.strict = env_bool(key, value)?;
            }

            // Logging section
            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled = env_bool(key, value)?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected 'json' or 'pretty'"))?;
            }

            // Unknown key - ignore
            _ => {}
        }

        Ok(())
    }
}

fn env_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [contract]
        path = "openapi.yaml"
    "#;

    #[test]
    fn test_loader_defaults_need_contract() {
        let result = ConfigLoader::new().with_defaults().load();
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_loader_load_unvalidated() {
        let config = ConfigLoader::new().load_unvalidated();
        assert!(config.contract.path.is_none());
        assert!(config.validation.enabled);
    }

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load_unvalidated();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load_unvalidated();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_string_toml() {
        let config = ConfigLoader::new()
            .with_string(MINIMAL, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.contract.path, Some(PathBuf::from("openapi.yaml")));
        assert_eq!(config.validation.options.params_key, "covenant.params");
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{
            "contract": {"path": "api.json"},
            "validation": {"options": {"allow_get_body": true, "query_hash_key": null}}
        }"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert!(config.validation.options.allow_get_body);
        assert!(config.validation.options.query_hash_key.is_none());
    }

    #[test]
    fn test_loader_rejects_unknown_section() {
        let toml = r#"
            [server]
            http_addr = "0.0.0.0:8080"
        "#;
        let result = ConfigLoader::new().with_string(toml, "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_rejects_unknown_format() {
        let result = ConfigLoader::new().with_string("", "ini");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/covenant.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let loader = ConfigLoader::new()
            .with_optional_file("/nonexistent/covenant.toml")
            .unwrap();
        assert!(!loader.file_loaded());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));

        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));

        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    // Overrides are exercised through apply_env_var directly; mutating the
    // process environment in parallel tests is racy.

    #[test]
    fn test_apply_env_var_contract_path() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__CONTRACT__PATH", "/srv/openapi.yaml", "TEST")
            .unwrap();
        assert_eq!(
            loader.config.contract.path,
            Some(PathBuf::from("/srv/openapi.yaml"))
        );
    }

    #[test]
    fn test_apply_env_var_options() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__VALIDATION__OPTIONS__ALLOW_GET_BODY", "yes", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__VALIDATION__OPTIONS__PARAMS_KEY", "app.params", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__VALIDATION__OPTIONS__QUERY_HASH_KEY", "none", "TEST")
            .unwrap();

        let options = &loader.config.validation.options;
        assert!(options.allow_get_body);
        assert_eq!(options.params_key, "app.params");
        assert!(options.query_hash_key.is_none());
    }

    #[test]
    fn test_apply_env_var_response() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__RESPONSE__ENFORCE", "true", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__RESPONSE__STRICT", "1", "TEST")
            .unwrap();
        assert!(loader.config.response.enforce);
        assert!(loader.config.response.strict);
    }

    #[test]
    fn test_apply_env_var_invalid_boolean() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__RESPONSE__ENFORCE", "sometimes", "TEST");
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    fn test_apply_env_var_log_format() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__LOGGING__FORMAT", "pretty", "TEST")
            .unwrap();
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);

        let result = loader.apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST");
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_env_var_unknown_key_ignored() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__SERVER__HTTP_ADDR", "0.0.0.0:1", "TEST")
            .unwrap();
        assert_eq!(loader.config, CovenantConfig::default());
    }

    #[test]
    fn test_complete_toml_config() {
        let toml = r#"
            [contract]
            path = "/etc/contracts/petstore.yaml"

            [validation]
            enabled = true

            [validation.options]
            coerce_path_params = false
            optimistic_json = true
            validate_success_only = true
            params_key = "app.params"
            headers_key = "app.headers"
            path_hash_key = "app.path"
            query_hash_key = "app.query"

            [response]
            enabled = true
            enforce = true
            strict = true

            [logging]
            enabled = true
            level = "covenant=debug,info"
            format = "pretty"
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        let options = &config.validation.options;
        assert!(!options.coerce_path_params);
        assert!(options.optimistic_json);
        assert!(options.validate_success_only);
        assert!(options.allow_form_params);
        assert_eq!(options.query_hash_key.as_deref(), Some("app.query"));
        assert!(config.response.strict);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }
}
