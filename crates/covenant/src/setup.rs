//! Wiring a validated pipeline from configuration.

use std::path::Path;
use std::sync::Arc;

use covenant_config::{ConfigError, CovenantConfig, ResponseValidationConfig};
use covenant_core::ValidatorOptions;
use covenant_middleware::{
    ContractValidation, Pipeline, RequestValidationMiddleware, ResponseValidationMiddleware,
};
use covenant_router::{PathRouter, RouterError};
use covenant_schema::{ContractError, OpenApiDocument, OpenApiValidator};
use covenant_telemetry::{LogConfig, TelemetryError};
use thiserror::Error;
use tracing::info;

/// The validation built from the default router and schema validator.
pub type DefaultValidation = ContractValidation<PathRouter, OpenApiValidator>;

/// Errors raised while setting Covenant up.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The contract could not be loaded.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// A path template in the contract could not be compiled.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// Logging could not be initialised.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// A loaded contract together with the pipeline that enforces it.
///
/// ```no_run
/// use covenant::{Covenant, config::ConfigLoader};
///
/// # fn main() -> Result<(), covenant::SetupError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("covenant.toml")?
///     .with_env_prefix("COVENANT")
///     .load()?;
///
/// let covenant = Covenant::from_config(&config)?;
/// let pipeline = covenant.pipeline();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Covenant {
    validation: Arc<DefaultValidation>,
    request_stage: bool,
    response: Option<ResponseValidationConfig>,
}

impl Covenant {
    /// Loads the contract named by the configuration.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or the contract cannot be
    /// loaded or routed.
    pub fn from_config(config: &CovenantConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let path = config
            .contract
            .path
            .as_deref()
            .ok_or_else(|| ConfigError::missing_field("contract.path"))?;

        let mut covenant = Self::from_file(path, config.validation.options.clone())?;
        covenant.request_stage = config.validation.enabled;
        covenant.response = config.response.enabled.then_some(config.response);
        Ok(covenant)
    }

    /// Loads a contract file with the given options.
    ///
    /// Both stages are on; the response stage observes without enforcing.
    pub fn from_file(path: impl AsRef<Path>, options: ValidatorOptions) -> Result<Self, SetupError> {
        let document = OpenApiDocument::from_file(path)?;
        Self::from_document(&document, options)
    }

    /// Builds the default router and validator for a loaded document.
    pub fn from_document(
        document: &OpenApiDocument,
        options: ValidatorOptions,
    ) -> Result<Self, SetupError> {
        let contract = document.to_contract()?;
        let router = PathRouter::new(&contract)?;
        info!(
            operations = contract.len(),
            dialect = ?document.dialect(),
            "contract validation ready"
        );

        Ok(Self {
            validation: Arc::new(ContractValidation::new(
                router,
                OpenApiValidator::for_document(document),
                options,
            )),
            request_stage: true,
            response: Some(ResponseValidationConfig::default()),
        })
    }

    /// The shared validation, for callers that drive it directly.
    pub fn validation(&self) -> &Arc<DefaultValidation> {
        &self.validation
    }

    /// A pipeline with the configured stages: request validation first,
    /// then response validation.
    pub fn pipeline(&self) -> Pipeline {
        let mut builder = Pipeline::builder();
        if self.request_stage {
            builder = builder.stage(RequestValidationMiddleware::new(self.validation.clone()));
        }
        if let Some(response) = self.response {
            let stage = if response.enforce {
                ResponseValidationMiddleware::enforcing(self.validation.clone())
            } else {
                ResponseValidationMiddleware::observe(self.validation.clone())
            };
            builder = builder.stage(stage.with_strict(response.strict));
        }
        builder.build()
    }
}

/// Installs the global log subscriber described by the configuration.
///
/// # Errors
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init_logging(config: &CovenantConfig) -> Result<(), SetupError> {
    covenant_telemetry::init_logging(&LogConfig::from(&config.logging))?;
    Ok(())
}
