//! Layered configuration for Covenant.
//!
//! This crate loads the settings a service needs to put contract validation
//! in front of its handlers:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`CovenantConfig`] has four sections:
//!
//! - [`ContractConfig`] - where the OpenAPI document lives
//! - [`ValidationConfig`] - request validation and the validator options
//! - [`ResponseValidationConfig`] - observe or enforce, strict or lenient
//! - [`LoggingConfig`] - log level and format
//!
//! # Example
//!
//! ```no_run
//! use covenant_config::ConfigLoader;
//!
//! # fn main() -> Result<(), covenant_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("covenant.toml")?
//!     .with_env_prefix("COVENANT")
//!     .load()?;
//!
//! println!("validating against {:?}", config.contract.path);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [contract]
//! path = "openapi.yaml"
//!
//! [validation]
//! enabled = true
//!
//! [validation.options]
//! coerce_path_params = true
//! allow_get_body = false
//! params_key = "covenant.params"
//! query_hash_key = "covenant.query_hash"
//!
//! [response]
//! enabled = true
//! enforce = false
//! strict = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `COVENANT__CONTRACT__PATH=/srv/openapi.yaml`
//! - `COVENANT__VALIDATION__OPTIONS__OPTIMISTIC_JSON=true`
//! - `COVENANT__RESPONSE__ENFORCE=true`
//! - `COVENANT__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CovenantConfig::default();
        assert!(config.response.enabled);
        assert!(!config.response.strict);
        assert_eq!(config.logging.level, "info");
    }
}
