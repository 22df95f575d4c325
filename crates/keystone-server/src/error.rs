//! Server error types.

use std::io;
use std::net::SocketAddr;

use keystone_config::ConfigError;
use keystone_telemetry::TelemetryError;
use thiserror::Error;

/// Errors raised while setting up or running a service.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// Address the server tried to bind.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configured port does not fit a TCP port.
    #[error("port {port} is out of range")]
    InvalidPort {
        /// The configured value.
        port: i64,
    },

    /// Documentation could not be written.
    #[error("could not write docs to {target}: {source}")]
    Docs {
        /// `-` for stdout, otherwise the file path.
        target: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// OS signal handlers could not be installed.
    #[error("failed to register signal handler: {0}")]
    Signal(#[source] io::Error),

    /// Other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Logging could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Configuration was unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ServerError {
    /// Creates a docs error.
    pub fn docs(target: impl Into<String>, source: io::Error) -> Self {
        Self::Docs {
            target: target.into(),
            source,
        }
    }
}
