//! Sample Keystone service.
//!
//! Serves three endpoints that show the standard bootstrap at work:
//!
//! - `GET /count/:first/:last` returns the integers from `first` to `last`
//! - `GET /passthrough/:first/:last` asks another instance to count
//! - `GET /die/:code` exits the process with `code` after one second

#![doc(html_root_url = "https://docs.rs/keystone-demo/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod count;
pub mod service;

pub use count::ExitFn;
pub use service::{CountService, DEFAULT_PASSTHROUGH, PASSTHROUGH};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
