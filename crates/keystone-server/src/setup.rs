//! Standard service setup.
//!
//! Every Keystone service starts the same way:
//!
//! ```rust,ignore
//! let mut registry = keystone_server::default_config();
//! registry.add_string("passthrough", "http://localhost:9998");
//! registry.set_default("port", 9999);
//! let config = registry.load()?;
//!
//! match keystone_server::standard_setup(&config, &mut my_builder)? {
//!     Setup::DocsWritten => {}
//!     Setup::Serve(server) => server.run_with_shutdown(shutdown).await?,
//! }
//! ```

use std::fs::File;
use std::io::{self, Write};

use keystone_config::{Config, ConfigRegistry};
use keystone_telemetry::{init_logging, LogConfig, TelemetryError};
use tracing::Span;

use crate::access_log::AccessLog;
use crate::config::ServerConfig;
use crate::cors::{Cors, CorsConfig};
use crate::error::ServerError;
use crate::middleware::Pipeline;
use crate::server::Server;
use crate::service::Service;

/// Configuration key selecting docs mode.
pub const DOCS: &str = "docs";

/// Configuration key for the service root path.
pub const ROOT_PATH: &str = "rootpath";

/// Builds a service for [`standard_setup`].
pub trait ServiceBuilder {
    /// Builds the service mounted at `root_path`.
    ///
    /// `logger` is the span requests run in; it is [`Span::none`] in docs
    /// mode.
    fn build(&mut self, logger: Span, root_path: &str) -> Service;

    /// Returns the span given to the last [`build`](Self::build).
    fn logger(&self) -> Span;
}

/// What [`standard_setup`] decided.
#[derive(Debug)]
pub enum Setup {
    /// Docs mode: documentation was handled and nothing should be served.
    DocsWritten,
    /// A server ready to run.
    Serve(Server),
}

/// Declares the settings every service uses.
///
/// | name            | kind        | default                     |
/// |-----------------|-------------|-----------------------------|
/// | `docs`          | string      | `""`                        |
/// | `CORS_ORIGINS`  | string list | `*`                         |
/// | `CORS_METHODS`  | string list | `GET`,`POST`,`PUT`,`DELETE` |
/// | `CORS_DEBUG`    | flag        | `false`                     |
/// | `port`          | int         | `8080`                      |
/// | `rootpath`      | string      | `/`                         |
/// | `READ_TIMEOUT`  | duration    | `5s`                        |
/// | `WRITE_TIMEOUT` | duration    | `5s`                        |
/// | `LOG_LEVEL`     | string      | `info`                      |
/// | `LOG_JSON`      | flag        | `true`                      |
#[must_use]
pub fn default_config() -> ConfigRegistry {
    let mut registry = ConfigRegistry::new();
    registry.add_string(DOCS, "");
    registry.add_string_list(crate::cors::CORS_ORIGINS, ["*"]);
    registry.add_string_list(crate::cors::CORS_METHODS, ["GET", "POST", "PUT", "DELETE"]);
    registry.add_flag(crate::cors::CORS_DEBUG, false);
    registry.add_int("port", 8080);
    registry.add_string(ROOT_PATH, "/");
    registry.add_duration("READ_TIMEOUT", "5s");
    registry.add_duration("WRITE_TIMEOUT", "5s");
    registry.add_string(keystone_telemetry::logging::LOG_LEVEL_KEY, "info");
    registry.add_flag(keystone_telemetry::logging::LOG_JSON_KEY, true);
    registry
}

/// Sets up a service from a loaded configuration.
///
/// If `docs` is set, the service is built with [`Span::none`] and nothing
/// is served. With `docs=-` the markdown documentation goes to stdout. Any
/// other value names a file that is created (or truncated) but left empty.
///
/// Otherwise logging is initialized from `LOG_LEVEL`/`LOG_JSON`, the service
/// is built inside a span carrying the root path, and wrapped in CORS and
/// request logging. The returned server listens on every interface at
/// `port`.
///
/// # Errors
///
/// - [`ServerError::Docs`] if the documentation target cannot be written
/// - [`ServerError::InvalidPort`] if `port` is out of range
/// - [`ServerError::Telemetry`] if `LOG_LEVEL` is not a valid filter
/// - [`ServerError::Config`] if a standard key holds the wrong kind
pub fn standard_setup<B>(config: &Config, builder: &mut B) -> Result<Setup, ServerError>
where
    B: ServiceBuilder + ?Sized,
{
    let root_path = config.try_get_string(ROOT_PATH)?;
    let docs = config.try_get_string(DOCS)?;

    if !docs.is_empty() {
        write_docs(docs, root_path, builder)?;
        return Ok(Setup::DocsWritten);
    }

    match init_logging(&LogConfig::from_config(config)) {
        Ok(()) => {}
        Err(TelemetryError::LoggingInit(reason)) => {
            tracing::debug!(%reason, "keeping the installed log subscriber");
        }
        Err(e) => return Err(e.into()),
    }

    let span = tracing::info_span!("service", rootpath = %root_path);
    let service = builder.build(span.clone(), root_path);

    let server_config = ServerConfig::from_config(config)?;
    let pipeline = Pipeline::new(service)
        .with(Cors::new(CorsConfig::from_config(config)))
        .with(AccessLog::new())
        .handler_timeout(server_config.write_timeout())
        .span(span.clone());

    tracing::info!(parent: &span, port = server_config.addr().port(), "server listening");
    Ok(Setup::Serve(Server::new(server_config, pipeline)))
}

fn write_docs<B>(target: &str, root_path: &str, builder: &mut B) -> Result<(), ServerError>
where
    B: ServiceBuilder + ?Sized,
{
    if target != "-" {
        // A file target is only created; documentation goes to stdout alone.
        File::create(target).map_err(|e| ServerError::docs(target, e))?;
        return Ok(());
    }

    let service = builder.build(Span::none(), root_path);
    let mut out = io::stdout().lock();
    service
        .generate_docs(&mut out)
        .and_then(|()| out.flush())
        .map_err(|e| ServerError::docs(target, e))
}
