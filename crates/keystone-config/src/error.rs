//! Configuration error types.

use thiserror::Error;

use crate::{LoadStage, ValueKind};

/// Errors that can occur while declaring, loading or reading configuration.
///
/// `UnrecognizedFlag` and `MissingRequired` are fatal startup conditions: a
/// service that sees either must not start serving. `TypeMismatch` is a
/// programmer error in the service's own declarations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A command-line flag did not match any declared entry.
    #[error("unrecognized command line argument: {token}")]
    UnrecognizedFlag {
        /// The full argument as given on the command line.
        token: String,
    },

    /// A required entry has neither an override nor a default.
    #[error("required {kind} parameter {name} was not found")]
    MissingRequired {
        /// The entry name as declared.
        name: String,
        /// The declared kind of the entry.
        kind: ValueKind,
    },

    /// A typed getter was used on an entry holding a different kind.
    #[error("configuration value {name} holds a {actual}, not a {expected}")]
    TypeMismatch {
        /// The name passed to the getter.
        name: String,
        /// The kind the getter returns.
        expected: ValueKind,
        /// The kind actually stored.
        actual: ValueKind,
    },

    /// A load stage was run out of sequence.
    #[error("configuration cannot move to the {attempted} stage from the {actual} stage")]
    OutOfOrder {
        /// The stage that was attempted.
        attempted: LoadStage,
        /// The stage the registry is in.
        actual: LoadStage,
    },

    /// A `.env` file exists but could not be read or parsed.
    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl ConfigError {
    /// Create a new unrecognized flag error.
    pub fn unrecognized_flag(token: impl Into<String>) -> Self {
        Self::UnrecognizedFlag {
            token: token.into(),
        }
    }

    /// Create a new missing required entry error.
    pub fn missing_required(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::MissingRequired {
            name: name.into(),
            kind,
        }
    }

    /// Create a new type mismatch error.
    pub fn type_mismatch(name: impl Into<String>, expected: ValueKind, actual: ValueKind) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Create a new out-of-order stage error.
    pub fn out_of_order(attempted: LoadStage, actual: LoadStage) -> Self {
        Self::OutOfOrder { attempted, actual }
    }

    /// Returns `true` if this error must stop the service from starting.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedFlag { .. } | Self::MissingRequired { .. } | Self::Dotenv(_)
        )
    }
}
