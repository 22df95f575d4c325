//! Load orchestration and validation.
//!
//! Loading runs three one-shot stages in a fixed order:
//!
//! 1. environment overrides ([`ConfigRegistry::apply_env`])
//! 2. command-line overrides ([`ConfigRegistry::apply_args`])
//! 3. validation ([`ConfigRegistry::validate`]), which freezes the registry
//!
//! [`ConfigLoader`] bundles the sources and runs all three.

use std::ffi::OsString;

use crate::env::{load_dotenv, EnvSource, ProcessEnv};
use crate::registry::{Config, ConfigRegistry, LoadStage};
use crate::ConfigError;

impl ConfigRegistry {
    /// Checks that every entry resolved and freezes the registry.
    ///
    /// Must run after [`apply_args`](Self::apply_args).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequired`] for the first entry, in
    /// declaration order, that has neither an override nor a default.
    pub fn validate(mut self) -> Result<Config, ConfigError> {
        if self.stage != LoadStage::CmdLineApplied {
            return Err(ConfigError::out_of_order(LoadStage::Validated, self.stage));
        }

        if let Some(missing) = self.entries().find(|e| e.resolved().is_none()) {
            return Err(ConfigError::missing_required(missing.name(), missing.kind()));
        }

        self.advance(LoadStage::CmdLineApplied, LoadStage::Validated)?;
        tracing::debug!(entries = self.len(), "configuration validated");
        Ok(Config::freeze(self))
    }

    /// Runs every stage against the given sources.
    ///
    /// `args` must not include the program name.
    pub fn load_from<E, I, S>(mut self, env: &E, args: I) -> Result<Config, ConfigError>
    where
        E: EnvSource + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.apply_env(env)?;
        self.apply_args(args)?;
        self.validate()
    }

    /// Runs every stage against the process environment and arguments.
    pub fn load(self) -> Result<Config, ConfigError> {
        ConfigLoader::new(self).load()
    }
}

/// Builder that collects the sources for a load.
///
/// # Example
///
/// ```
/// use keystone_config::{ConfigLoader, ConfigRegistry, MapEnv};
///
/// let mut registry = ConfigRegistry::new();
/// registry.add_required_int("threshold");
///
/// let config = ConfigLoader::new(registry)
///     .with_env(MapEnv::new().with("THRESHOLD", "3"))
///     .with_args(Vec::<String>::new())
///     .load()?;
///
/// assert_eq!(config.get_int("threshold"), 3);
/// # Ok::<(), keystone_config::ConfigError>(())
/// ```
pub struct ConfigLoader {
    registry: ConfigRegistry,
    env: Box<dyn EnvSource>,
    args: Vec<String>,
    dotenv: bool,
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("registry", &self.registry)
            .field("args", &self.args)
            .field("dotenv", &self.dotenv)
            .finish_non_exhaustive()
    }
}

impl ConfigLoader {
    /// Creates a loader reading the process environment and arguments.
    #[must_use]
    pub fn new(registry: ConfigRegistry) -> Self {
        Self {
            registry,
            env: Box::new(ProcessEnv),
            args: lossy_args(std::env::args_os().skip(1)),
            dotenv: false,
        }
    }

    /// Replaces the environment source.
    #[must_use]
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Replaces the command-line arguments (program name excluded).
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Loads a `.env` file into the process environment before the
    /// environment stage.
    #[must_use]
    pub fn with_dotenv(mut self) -> Self {
        self.dotenv = true;
        self
    }

    /// Runs every stage and returns the frozen configuration.
    pub fn load(self) -> Result<Config, ConfigError> {
        if self.dotenv {
            load_dotenv()?;
        }
        self.registry.load_from(self.env.as_ref(), &self.args)
    }
}

/// Converts raw arguments to strings, replacing invalid UTF-8.
///
/// A token with invalid bytes can still be a flag whose value holds them;
/// anything else fails the flag pattern and is ignored like any other
/// positional token.
fn lossy_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}
