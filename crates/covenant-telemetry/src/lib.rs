//! Logging and metrics for Covenant.
//!
//! - **Logging**: structured JSON or pretty output through `tracing-subscriber`
//! - **Metrics**: validation counters through the `metrics` facade
//!
//! The validation core never logs or records anything itself. The middleware
//! stages do, using the field names in [`logging::fields`] and the recorders
//! in [`metrics`].
//!
//! # Example
//!
//! ```rust,ignore
//! use covenant_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};
pub use crate::metrics::Phase;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
