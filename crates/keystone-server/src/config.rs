//! Server settings.
//!
//! # Example
//!
//! ```rust
//! use keystone_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .port(9999)
//!     .read_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.addr().port(), 9999);
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use keystone_config::Config;

use crate::error::ServerError;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default read and write timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default graceful shutdown drain window in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Listener address and timeouts.
///
/// A zero timeout disables that bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    addr: SocketAddr,
    read_timeout: Duration,
    write_timeout: Duration,
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Reads `port`, `READ_TIMEOUT` and `WRITE_TIMEOUT` from the standard
    /// configuration. The server listens on every interface.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidPort`] if `port` is not in `0..=65535`.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let port = config.try_get_int("port")?;
        let port = u16::try_from(port).map_err(|_| ServerError::InvalidPort { port })?;

        Ok(Self::builder()
            .port(port)
            .read_timeout(config.try_get_duration("READ_TIMEOUT")?)
            .write_timeout(config.try_get_duration("WRITE_TIMEOUT")?)
            .build())
    }

    /// Returns the listening address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns how long a client may take to send request headers.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns how long a request may take to be read and answered.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Returns how long shutdown waits for open connections.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    addr: SocketAddr,
    read_timeout: Duration,
    write_timeout: Duration,
    shutdown_timeout: Duration,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            read_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }
}

impl ServerConfigBuilder {
    /// Sets the full listening address.
    #[must_use]
    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Sets the port, keeping the host.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Sets the header read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the request handling timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the shutdown drain window.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}
