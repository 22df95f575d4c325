//! # Keystone
//!
//! **Standard bootstrap for small HTTP services**
//!
//! Keystone gives every service the same start-up and shutdown behavior:
//!
//! - **Layered configuration** – typed defaults, overridden by environment
//!   variables, overridden by `--name=value` flags
//! - **Docs mode** – `--docs=-` prints the service's markdown API docs
//! - **Structured logging** – JSON or human-readable, filtered by `LOG_LEVEL`
//! - **CORS and request logging** – wrapped around every service
//! - **Signal handling** – `SIGINT`/`SIGTERM` stop the server gracefully
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keystone::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut registry = default_config();
//!     registry.set_default("port", 9999);
//!     let config = ConfigLoader::new(registry).with_dotenv().load()?;
//!
//!     let mut builder = MyService::default();
//!     if let Setup::Serve(server) = standard_setup(&config, &mut builder)? {
//!         server.run_with_shutdown(ShutdownSignal::new()).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! Request → CORS → AccessLog → Service route → Handler
//!                                                 ↓
//! Response ← CORS ← AccessLog (REQ line) ←───────┘
//! ```

#![doc(html_root_url = "https://docs.rs/keystone/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export configuration types
pub use keystone_config as config;

// Re-export server types
pub use keystone_server as server;

// Re-export logging setup
pub use keystone_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use keystone::prelude::*;
/// ```
pub mod prelude {
    pub use keystone_config::{Config, ConfigError, ConfigLoader, ConfigRegistry, Value, ValueKind};

    pub use keystone_server::{
        api_error, default_config, fatal_callback, json_response, ok, raw, shutdown_on_terminate,
        standard_setup, watch_signals, HttpResponse, Request, RequestExt, Route, Server, ServerError, Service,
        ServiceBuilder, Setup, ShutdownSignal, SignalHandlers, SignalOutcome,
    };

    pub use keystone_telemetry::{init_logging, LogConfig};
}
