//! Structured logging for Keystone services.
//!
//! Keystone logs through [`tracing`]. This crate installs the global
//! subscriber: JSON lines in production, a human-readable format during
//! development, both filtered by an [`EnvFilter`](tracing_subscriber::EnvFilter)
//! directive taken from the service configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use keystone_telemetry::{init_logging, LogConfig};
//!
//! let log_config = LogConfig::from_config(&config);
//! init_logging(&log_config)?;
//!
//! tracing::info!(port = 8080, "server listening");
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
