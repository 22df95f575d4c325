//! Environment variable overrides.
//!
//! Every declared entry is looked up under its canonical key (`READ_TIMEOUT`
//! for `read-timeout`). Unset or empty variables leave the entry alone.
//!
//! The environment is read through [`EnvSource`] so tests can supply a
//! [`MapEnv`] instead of touching the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::registry::{ConfigRegistry, LoadStage};
use crate::ConfigError;

/// A source of environment variables.
pub trait EnvSource {
    /// Returns the value of the variable, if set.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// An in-memory environment.
///
/// # Example
///
/// ```
/// use keystone_config::{EnvSource, MapEnv};
///
/// let env = MapEnv::new().with("PORT", "9000");
/// assert_eq!(env.var("PORT").as_deref(), Some("9000"));
/// assert_eq!(env.var("HOST"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigRegistry {
    /// Applies environment overrides to every declared entry.
    ///
    /// Must be the first load stage. Returns the number of entries
    /// overridden.
    pub fn apply_env<E: EnvSource + ?Sized>(&mut self, env: &E) -> Result<usize, ConfigError> {
        self.advance(LoadStage::Declared, LoadStage::EnvApplied)?;

        let mut applied = 0;
        for (key, entry) in &mut self.entries {
            let Some(raw) = env.var(key).filter(|v| !v.is_empty()) else {
                continue;
            };
            entry.set_override(&raw);
            applied += 1;
            tracing::debug!(key = %key, kind = %entry.kind(), "environment override applied");
        }

        Ok(applied)
    }
}

/// Loads `.env` from the current directory or its parents into the process
/// environment.
///
/// Variables already set in the process win. A missing file is not an
/// error; the path of the file loaded, if any, is returned.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded .env file");
            Ok(Some(path))
        }
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Loads a specific dotenv file into the process environment.
///
/// Returns `false` if the file does not exist.
pub fn load_dotenv_from(path: impl AsRef<Path>) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path.as_ref()) {
        Ok(()) => {
            tracing::debug!(path = %path.as_ref().display(), "loaded .env file");
            Ok(true)
        }
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}
