//! Configuration types.
//!
//! [`CovenantConfig`] is the root; each section has its own struct so that
//! files can set only the sections they care about.

use std::collections::HashSet;
use std::path::PathBuf;

use covenant_core::ValidatorOptions;
use covenant_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Complete Covenant configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use covenant_config::CovenantConfig;
///
/// let config = CovenantConfig::default();
/// assert!(config.validation.enabled);
/// assert!(!config.response.enforce);
/// assert_eq!(config.validation.options.params_key, "covenant.params");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CovenantConfig {
    /// Where the OpenAPI document lives.
    #[serde(default)]
    pub contract: ContractConfig,

    /// Request validation and validator options.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Response validation stage.
    #[serde(default)]
    pub response: ResponseValidationConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CovenantConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - `MissingField` when either stage is enabled without a contract path
    /// - `InvalidValue` when a storage key is empty
    /// - `ValidationError` when two storage keys are the same slot
    pub fn validate(&self) -> Result<(), ConfigError> {
        let needs_contract = self.validation.enabled || self.response.enabled;
        if needs_contract && self.contract.path.is_none() {
            return Err(ConfigError::missing_field("contract.path"));
        }

        let options = &self.validation.options;
        let named_keys = [
            ("validation.options.params_key", Some(&options.params_key)),
            ("validation.options.headers_key", Some(&options.headers_key)),
            ("validation.options.path_hash_key", Some(&options.path_hash_key)),
            ("validation.options.query_hash_key", options.query_hash_key.as_ref()),
        ];

        let mut seen = HashSet::new();
        for (field, key) in named_keys {
            let Some(key) = key else { continue };
            if key.trim().is_empty() {
                return Err(ConfigError::invalid_value(field, "must not be empty"));
            }
            if !seen.insert(key.as_str()) {
                return Err(ConfigError::validation_error(format!(
                    "storage key '{key}' is used by more than one slot"
                )));
            }
        }

        if covenant_telemetry::create_env_filter(&self.logging.level).is_err() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("invalid filter directive: {}", self.logging.level),
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, strict enforcing response
    /// validation.
    ///
    /// # Example
    ///
    /// ```
    /// use covenant_config::CovenantConfig;
    ///
    /// let config = CovenantConfig::development();
    /// assert!(config.response.enforce);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        Self {
            response: ResponseValidationConfig {
                enabled: true,
                enforce: true,
                strict: true,
            },
            logging: LoggingConfig {
                enabled: true,
                level: "debug".to_string(),
                format: LogFormat::Pretty,
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON logs, observe-only response validation.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Contract location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ContractConfig {
    /// Path to an OpenAPI document (`.json`, `.yaml` or `.yml`).
    pub path: Option<PathBuf>,
}

/// Request validation section.
///
/// ```toml
/// [validation]
/// enabled = true
///
/// [validation.options]
/// allow_get_body = true
/// query_hash_key = "app.query"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Whether the request stage runs at all.
    pub enabled: bool,

    /// Options handed to the validator.
    pub options: ValidatorOptions,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            options: ValidatorOptions::default(),
        }
    }
}

/// Response validation stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ResponseValidationConfig {
    /// Whether responses are validated.
    pub enabled: bool,

    /// Replace non-conforming responses with a 500 error envelope.
    pub enforce: bool,

    /// Require an exact status match and a declared media type.
    pub strict: bool,
}

impl Default for ResponseValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enforce: false,
            strict: false,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether to install a subscriber.
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `covenant_schema=debug`.
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        let base = match config.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: config.enabled,
            level: config.level.clone(),
            format: config.format,
            ..base
        }
    }
}
