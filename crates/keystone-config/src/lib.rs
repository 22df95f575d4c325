//! Layered, typed configuration for Keystone services.
//!
//! This crate provides the configuration registry every Keystone service is
//! bootstrapped from:
//! - Typed entries (int, string, string list, bool, duration) declared in code
//! - Environment variable overrides, matched by canonical name
//! - Command-line flag overrides (`--name=value`), which win over the environment
//! - Fail-fast validation of required entries
//!
//! # Overview
//!
//! A service declares its settings on a [`ConfigRegistry`], then loads it.
//! Loading applies the environment, then the command line, then validates,
//! and yields a read-only [`Config`]:
//!
//! ```no_run
//! use keystone_config::ConfigRegistry;
//!
//! # fn main() -> Result<(), keystone_config::ConfigError> {
//! let mut registry = ConfigRegistry::new();
//! registry.add_int("port", 8080);
//! registry.add_duration("read-timeout", "5s");
//! registry.add_required_string("database-url");
//!
//! // PORT=9000 my-service --read-timeout=1s --database-url=postgres://db
//! let config = registry.load()?;
//!
//! println!("listening on {}", config.get_int("port"));
//! # Ok(())
//! # }
//! ```
//!
//! # Naming
//!
//! Names are canonicalized by uppercasing and turning hyphens into
//! underscores. `read-timeout` is read from `READ_TIMEOUT` in the environment
//! and can be given as `--read-timeout`, `--READ_TIMEOUT` or `-read_timeout`
//! on the command line.
//!
//! # Parsing
//!
//! Raw values never fail to parse; malformed input becomes the zero value of
//! the entry's kind. See [`parse_value`].
//!
//! # Errors
//!
//! Loading fails with [`ConfigError::UnrecognizedFlag`] or
//! [`ConfigError::MissingRequired`]. The library never exits the process;
//! the caller decides how to stop.

#![doc(html_root_url = "https://docs.rs/keystone-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cli;
mod env;
mod error;
mod loader;
mod registry;
mod value;

pub use cli::{parse_flag, Flag};
pub use env::{load_dotenv, load_dotenv_from, EnvSource, MapEnv, ProcessEnv};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use registry::{canonical_key, Config, ConfigEntry, ConfigRegistry, LoadStage};
pub use value::{parse_duration, parse_value, Value, ValueKind};
