//! # Keystone Server
//!
//! Standard bootstrap for Keystone HTTP services.
//!
//! A service declares its settings on top of [`default_config`], loads them,
//! and hands a [`ServiceBuilder`] to [`standard_setup`]. Setup either writes
//! the service's markdown documentation (`--docs=-`) or returns a [`Server`]
//! that:
//!
//! - listens on every interface at `port`
//! - mounts the service under `rootpath`
//! - answers CORS preflights according to `CORS_ORIGINS`/`CORS_METHODS`
//! - logs one `REQ` line per request
//! - bounds header reads by `READ_TIMEOUT` and handling by `WRITE_TIMEOUT`
//! - stops gracefully when its [`ShutdownSignal`] fires
//!
//! ## Example
//!
//! ```rust,ignore
//! use keystone_server::{
//!     default_config, fatal_callback, shutdown_on_terminate, standard_setup, watch_signals,
//!     Setup, ShutdownSignal, SignalHandlers,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = default_config().load()?;
//!     let mut builder = MyService::default();
//!
//!     if let Setup::Serve(server) = standard_setup(&config, &mut builder)? {
//!         let shutdown = ShutdownSignal::new();
//!         let logger = builder.logger();
//!         let watcher = watch_signals(
//!             SignalHandlers::new()
//!                 .on_interrupt(fatal_callback(logger.clone(), "SIGINT", shutdown.clone()))
//!                 .on_terminate(fatal_callback(logger, "SIGTERM", shutdown.clone())),
//!         )?;
//!         shutdown_on_terminate(watcher, shutdown.clone());
//!         server.run_with_shutdown(shutdown).await?;
//!     }
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/keystone-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod access_log;
pub mod config;
pub mod cors;
pub mod error;
pub mod middleware;
pub mod response;
pub mod server;
pub mod service;
pub mod setup;
pub mod shutdown;
pub mod signals;

pub use access_log::{AccessLog, REQUEST_ID_HEADER};
pub use config::{ServerConfig, ServerConfigBuilder};
pub use cors::{AllowedOrigins, Cors, CorsConfig};
pub use error::ServerError;
pub use middleware::{Middleware, Next, Pipeline, RequestContext};
pub use response::{api_error, empty, json_response, ok, raw, ApiError, HttpResponse, JSON, MARKDOWN};
pub use server::Server;
pub use service::{BoxFuture, Handler, PathParams, Request, RequestExt, Route, RouteMatch, Service};
pub use setup::{default_config, standard_setup, ServiceBuilder, Setup};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
pub use signals::{
    fatal_callback, shutdown_on_terminate, watch_channel, watch_signals, Signal, SignalHandlers,
    SignalOutcome,
};
