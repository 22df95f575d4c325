//! Structured logging for Keystone services.
//!
//! Installs a global [`tracing`] subscriber. Production services log JSON
//! lines; development builds use the pretty formatter.
//!
//! # Example
//!
//! ```rust,ignore
//! use keystone_telemetry::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::default();
//! init_logging(&config)?;
//!
//! tracing::info!(port = 8080, "listening");
//! ```

use keystone_config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Configuration key holding the log filter directive.
pub const LOG_LEVEL_KEY: &str = "LOG_LEVEL";

/// Configuration key selecting JSON output.
pub const LOG_JSON_KEY: &str = "LOG_JSON";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "keystone_server=debug,hyper=warn").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            file_line_info: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Reads `LOG_LEVEL` and `LOG_JSON` from a loaded configuration.
    ///
    /// Keys that are undeclared, empty or of the wrong kind keep the
    /// production defaults.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut log_config = Self::production();

        if let Ok(level) = config.try_get_string(LOG_LEVEL_KEY) {
            if !level.trim().is_empty() {
                log_config.level = level.trim().to_string();
            }
        }
        if config.contains(LOG_JSON_KEY) {
            if let Ok(json) = config.try_get_flag(LOG_JSON_KEY) {
                log_config.json_format = json;
            }
        }

        log_config
    }
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the level is not a valid
/// filter directive, and [`TelemetryError::LoggingInit`] if a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Logs one access-log line for a completed request.
///
/// The message is always `REQ` so log pipelines can select request lines.
/// Fields: `request_id`, `host`, `remote_addr`, `method`, `uri`, `code`,
/// `len`, `ua` and `took`.
#[macro_export]
macro_rules! log_access {
    ($request_id:expr, $host:expr, $remote_addr:expr, $method:expr, $uri:expr, $code:expr, $len:expr, $ua:expr, $took:expr) => {
        tracing::info!(
            request_id = %$request_id,
            host = %$host,
            remote_addr = %$remote_addr,
            method = %$method,
            uri = %$uri,
            code = $code,
            len = $len,
            ua = %$ua,
            took = ?$took,
            "REQ"
        );
    };
}
