//! The configuration registry.
//!
//! A [`ConfigRegistry`] maps canonical keys to [`ConfigEntry`] values. Entries
//! are declared during setup, overridden by the environment and command-line
//! loaders, and checked by the validator, which freezes the registry into a
//! read-only [`Config`].

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::value::{parse_value, Value, ValueKind};
use crate::ConfigError;

/// Normalizes a configuration name into its lookup key.
///
/// Hyphens become underscores, letters are uppercased and surrounding
/// whitespace is trimmed. The result is also the environment variable name.
///
/// # Example
///
/// ```
/// use keystone_config::canonical_key;
///
/// assert_eq!(canonical_key("read-timeout"), "READ_TIMEOUT");
/// assert_eq!(canonical_key("Cors_Origins"), "CORS_ORIGINS");
/// ```
#[must_use]
pub fn canonical_key(name: &str) -> String {
    name.replace('-', "_").to_uppercase().trim().to_string()
}

/// One declared configuration item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    name: String,
    kind: ValueKind,
    default: Option<Value>,
    value: Option<Value>,
}

impl ConfigEntry {
    /// Creates an entry with no override.
    pub fn new(name: impl Into<String>, kind: ValueKind, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
            value: None,
        }
    }

    /// Returns the name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the canonical lookup key.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        canonical_key(&self.name)
    }

    /// Returns the declared kind.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns the compiled-in default, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the override from the environment or command line, if any.
    #[must_use]
    pub fn override_value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Returns the override if present, otherwise the default.
    #[must_use]
    pub fn resolved(&self) -> Option<&Value> {
        self.value.as_ref().or(self.default.as_ref())
    }

    /// Returns `true` if the entry is required (it has no default).
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Parses `raw` per the declared kind and stores it as the override.
    pub(crate) fn set_override(&mut self, raw: &str) {
        self.value = Some(parse_value(raw, self.kind));
    }
}

/// Where a registry is in its load sequence.
///
/// Stages only move forward: `Declared → EnvApplied → CmdLineApplied →
/// Validated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadStage {
    /// Entries are being declared; no source has been applied.
    Declared,
    /// Environment overrides have been applied.
    EnvApplied,
    /// Command-line overrides have been applied.
    CmdLineApplied,
    /// Every entry resolved; the registry is frozen.
    Validated,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Declared => "declared",
            Self::EnvApplied => "env-applied",
            Self::CmdLineApplied => "cmdline-applied",
            Self::Validated => "validated",
        })
    }
}

/// A typed key-value registry with layered overrides.
///
/// Precedence, lowest first: default, environment, command line.
///
/// # Example
///
/// ```
/// use keystone_config::{ConfigRegistry, MapEnv};
///
/// let mut registry = ConfigRegistry::new();
/// registry.add_int("port", 8080);
/// registry.add_flag("verbose", false);
///
/// let env = MapEnv::new().with("PORT", "9000");
/// let config = registry.load_from(&env, ["--port=9100", "--verbose"])?;
///
/// assert_eq!(config.get_int("port"), 9100);
/// assert!(config.get_flag("verbose"));
/// # Ok::<(), keystone_config::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    pub(crate) entries: IndexMap<String, ConfigEntry>,
    pub(crate) stage: LoadStage,
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            stage: LoadStage::Declared,
        }
    }

    /// Declares an entry, replacing any prior entry with the same canonical key.
    ///
    /// A `None` default makes the entry required.
    pub fn declare(&mut self, name: impl Into<String>, kind: ValueKind, default: Option<Value>) {
        let name = name.into();
        self.entries
            .insert(canonical_key(&name), ConfigEntry::new(name, kind, default));
    }

    /// Declares an integer entry with a default.
    pub fn add_int(&mut self, name: impl Into<String>, default: i64) {
        self.declare(name, ValueKind::Int, Some(Value::Int(default)));
    }

    /// Declares a string entry with a default.
    pub fn add_string(&mut self, name: impl Into<String>, default: impl Into<String>) {
        self.declare(name, ValueKind::String, Some(Value::Str(default.into())));
    }

    /// Declares a string-list entry with any number of default elements.
    pub fn add_string_list<I, S>(&mut self, name: impl Into<String>, defaults: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let defaults = defaults.into_iter().map(Into::into).collect();
        self.declare(name, ValueKind::StringList, Some(Value::StrList(defaults)));
    }

    /// Declares a boolean entry with a default.
    pub fn add_flag(&mut self, name: impl Into<String>, default: bool) {
        self.declare(name, ValueKind::Bool, Some(Value::Bool(default)));
    }

    /// Declares a duration entry whose default is a duration expression.
    ///
    /// The default goes through the same parser as overrides, so a malformed
    /// default becomes zero.
    pub fn add_duration(&mut self, name: impl Into<String>, default: &str) {
        self.declare(
            name,
            ValueKind::Duration,
            Some(parse_value(default, ValueKind::Duration)),
        );
    }

    /// Declares a required integer entry.
    pub fn add_required_int(&mut self, name: impl Into<String>) {
        self.declare(name, ValueKind::Int, None);
    }

    /// Declares a required string entry.
    pub fn add_required_string(&mut self, name: impl Into<String>) {
        self.declare(name, ValueKind::String, None);
    }

    /// Declares a required string-list entry.
    pub fn add_required_string_list(&mut self, name: impl Into<String>) {
        self.declare(name, ValueKind::StringList, None);
    }

    /// Declares a required boolean entry.
    pub fn add_required_flag(&mut self, name: impl Into<String>) {
        self.declare(name, ValueKind::Bool, None);
    }

    /// Declares a required duration entry.
    pub fn add_required_duration(&mut self, name: impl Into<String>) {
        self.declare(name, ValueKind::Duration, None);
    }

    /// Replaces the default of an entry.
    ///
    /// The value is not checked against the declared kind. A mismatch only
    /// surfaces when a typed getter reads the default, and that getter
    /// panics. Setting a default for an undeclared name declares it with the
    /// value's own kind.
    pub fn set_default(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.get_mut(&canonical_key(name)) {
            Some(entry) => entry.default = Some(value),
            None => {
                let kind = value.kind();
                self.declare(name, kind, Some(value));
            }
        }
    }

    /// Returns the resolved value of an entry.
    ///
    /// `None` means the name is undeclared, or declared as required and not
    /// yet supplied; use [`contains`](Self::contains) to tell them apart.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entry(name).and_then(ConfigEntry::resolved)
    }

    /// Returns `true` if an entry with this name is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&canonical_key(name))
    }

    /// Returns the entry declared under this name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ConfigEntry> {
        self.entries.get(&canonical_key(name))
    }

    /// Iterates over entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.entries.values()
    }

    /// Returns the number of declared entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the current load stage.
    #[must_use]
    pub fn stage(&self) -> LoadStage {
        self.stage
    }

    /// Reads an integer, or `0` if not found.
    pub fn try_get_int(&self, name: &str) -> Result<i64, ConfigError> {
        match self.get(name) {
            None => Ok(0),
            Some(Value::Int(v)) => Ok(*v),
            Some(other) => Err(ConfigError::type_mismatch(name, ValueKind::Int, other.kind())),
        }
    }

    /// Reads a string, or `""` if not found.
    pub fn try_get_string(&self, name: &str) -> Result<&str, ConfigError> {
        match self.get(name) {
            None => Ok(""),
            Some(Value::Str(v)) => Ok(v.as_str()),
            Some(other) => Err(ConfigError::type_mismatch(name, ValueKind::String, other.kind())),
        }
    }

    /// Reads a string list, or an empty slice if not found.
    pub fn try_get_string_list(&self, name: &str) -> Result<&[String], ConfigError> {
        match self.get(name) {
            None => Ok(&[]),
            Some(Value::StrList(v)) => Ok(v.as_slice()),
            Some(other) => Err(ConfigError::type_mismatch(
                name,
                ValueKind::StringList,
                other.kind(),
            )),
        }
    }

    /// Reads a boolean, or `false` if not found.
    pub fn try_get_flag(&self, name: &str) -> Result<bool, ConfigError> {
        match self.get(name) {
            None => Ok(false),
            Some(Value::Bool(v)) => Ok(*v),
            Some(other) => Err(ConfigError::type_mismatch(name, ValueKind::Bool, other.kind())),
        }
    }

    /// Reads a duration, or zero if not found.
    pub fn try_get_duration(&self, name: &str) -> Result<Duration, ConfigError> {
        match self.get(name) {
            None => Ok(Duration::ZERO),
            Some(Value::Duration(v)) => Ok(*v),
            Some(other) => Err(ConfigError::type_mismatch(
                name,
                ValueKind::Duration,
                other.kind(),
            )),
        }
    }

    /// Reads an integer, or `0` if not found.
    ///
    /// # Panics
    ///
    /// Panics if the entry holds a value of another kind.
    #[must_use]
    pub fn get_int(&self, name: &str) -> i64 {
        self.try_get_int(name).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Reads a string, or `""` if not found.
    ///
    /// # Panics
    ///
    /// Panics if the entry holds a value of another kind.
    #[must_use]
    pub fn get_string(&self, name: &str) -> &str {
        self.try_get_string(name).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Reads a string list, or an empty slice if not found.
    ///
    /// # Panics
    ///
    /// Panics if the entry holds a value of another kind.
    #[must_use]
    pub fn get_string_list(&self, name: &str) -> &[String] {
        self.try_get_string_list(name)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Reads a boolean, or `false` if not found.
    ///
    /// # Panics
    ///
    /// Panics if the entry holds a value of another kind.
    #[must_use]
    pub fn get_flag(&self, name: &str) -> bool {
        self.try_get_flag(name).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Reads a duration, or zero if not found.
    ///
    /// # Panics
    ///
    /// Panics if the entry holds a value of another kind.
    #[must_use]
    pub fn get_duration(&self, name: &str) -> Duration {
        self.try_get_duration(name)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    // Moves to `next` if the registry is at `from`.
    pub(crate) fn advance(&mut self, from: LoadStage, next: LoadStage) -> Result<(), ConfigError> {
        if self.stage != from {
            return Err(ConfigError::out_of_order(next, self.stage));
        }
        self.stage = next;
        Ok(())
    }
}

/// A validated, read-only configuration.
///
/// Produced by [`ConfigRegistry::validate`]. Dereferences to the registry for
/// the getters; mutation is impossible since only `&ConfigRegistry` is
/// reachable. Cloning is cheap, so request workers can each hold one.
#[derive(Debug, Clone)]
pub struct Config {
    registry: Arc<ConfigRegistry>,
}

impl Config {
    pub(crate) fn freeze(registry: ConfigRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

impl Deref for Config {
    type Target = ConfigRegistry;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("port"), "PORT");
        assert_eq!(canonical_key("read-timeout"), "READ_TIMEOUT");
        assert_eq!(canonical_key("CORS_ORIGINS"), "CORS_ORIGINS");
        assert_eq!(canonical_key(" docs "), "DOCS");
    }

    #[test]
    fn test_default_returned_without_override() {
        let mut registry = ConfigRegistry::new();
        registry.add_int("port", 8080);
        registry.add_string("rootpath", "/");
        registry.add_string_list("methods", ["GET", "POST"]);
        registry.add_flag("debug", false);
        registry.add_duration("timeout", "5s");

        assert_eq!(registry.get("port"), Some(&Value::Int(8080)));
        assert_eq!(registry.get_string("rootpath"), "/");
        assert_eq!(registry.get_string_list("methods"), ["GET", "POST"]);
        assert!(!registry.get_flag("debug"));
        assert_eq!(registry.get_duration("timeout"), Duration::from_secs(5));
    }

    #[test]
    fn test_lookup_is_canonical() {
        let mut registry = ConfigRegistry::new();
        registry.add_duration("READ_TIMEOUT", "1s");

        assert!(registry.contains("read-timeout"));
        assert!(registry.contains("Read_Timeout"));
        assert_eq!(registry.get_duration("read-timeout"), Duration::from_secs(1));
        assert_eq!(registry.entry("read_timeout").unwrap().name(), "READ_TIMEOUT");
    }

    #[test]
    fn test_redeclare_discards_prior_entry() {
        let mut registry = ConfigRegistry::new();
        registry.add_int("limit", 10);
        registry.add_string("LIMIT", "ten");

        assert_eq!(registry.len(), 1);
        let entry = registry.entry("limit").unwrap();
        assert_eq!(entry.kind(), ValueKind::String);
        assert_eq!(entry.name(), "LIMIT");
        assert_eq!(registry.get_string("limit"), "ten");
    }

    #[test]
    fn test_redeclare_clears_override() {
        let mut registry = ConfigRegistry::new();
        registry.add_int("limit", 10);
        registry.entries.get_mut("LIMIT").unwrap().set_override("20");
        assert_eq!(registry.get_int("limit"), 20);

        registry.add_required_int("limit");
        assert_eq!(registry.get("limit"), None);
        assert!(registry.contains("limit"));
    }

    #[test]
    fn test_set_default_then_get() {
        let mut registry = ConfigRegistry::new();
        registry.add_int("port", 8080);
        registry.set_default("port", 9999);

        assert_eq!(registry.get("port"), Some(&Value::Int(9999)));
    }

    #[test]
    fn test_set_default_on_required_entry() {
        let mut registry = ConfigRegistry::new();
        registry.add_required_string("token");
        registry.set_default("token", "abc");

        assert!(!registry.entry("token").unwrap().is_required());
        assert_eq!(registry.get_string("token"), "abc");
    }

    #[test]
    fn test_set_default_on_undeclared_name() {
        let mut registry = ConfigRegistry::new();
        registry.set_default("extra", true);

        let entry = registry.entry("EXTRA").unwrap();
        assert_eq!(entry.kind(), ValueKind::Bool);
        assert!(registry.get_flag("extra"));
    }

    #[test]
    fn test_override_beats_default() {
        let mut entry = ConfigEntry::new("port", ValueKind::Int, Some(Value::Int(1)));
        assert_eq!(entry.resolved(), Some(&Value::Int(1)));

        entry.set_override("2");
        assert_eq!(entry.resolved(), Some(&Value::Int(2)));
        assert_eq!(entry.default_value(), Some(&Value::Int(1)));
    }

    #[test]
    fn test_missing_names_yield_zero_values() {
        let registry = ConfigRegistry::new();

        assert_eq!(registry.get("nothing"), None);
        assert!(!registry.contains("nothing"));
        assert_eq!(registry.get_int("nothing"), 0);
        assert_eq!(registry.get_string("nothing"), "");
        assert!(registry.get_string_list("nothing").is_empty());
        assert!(!registry.get_flag("nothing"));
        assert_eq!(registry.get_duration("nothing"), Duration::ZERO);
    }

    #[test]
    fn test_try_get_reports_mismatch() {
        let mut registry = ConfigRegistry::new();
        registry.add_int("port", 8080);
        registry.set_default("port", "8080");

        let err = registry.try_get_int("port").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TypeMismatch {
                expected: ValueKind::Int,
                actual: ValueKind::String,
                ..
            }
        ));
        assert_eq!(registry.try_get_string("port").unwrap(), "8080");
    }

    #[test]
    #[should_panic(expected = "holds a string, not a int")]
    fn test_get_int_panics_on_mismatch() {
        let mut registry = ConfigRegistry::new();
        registry.add_string("port", "8080");
        let _ = registry.get_int("port");
    }

    #[test]
    #[should_panic(expected = "not a duration")]
    fn test_get_duration_panics_on_mismatch() {
        let mut registry = ConfigRegistry::new();
        registry.add_duration("timeout", "5s");
        registry.set_default("timeout", "5s");
        let _ = registry.get_duration("timeout");
    }

    #[test]
    fn test_entries_in_declaration_order() {
        let mut registry = ConfigRegistry::new();
        registry.add_int("b", 1);
        registry.add_int("a", 2);
        registry.add_int("c", 3);

        let names: Vec<_> = registry.entries().map(ConfigEntry::name).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn test_malformed_duration_default_is_zero() {
        let mut registry = ConfigRegistry::new();
        registry.add_duration("timeout", "soon");
        assert_eq!(registry.get_duration("timeout"), Duration::ZERO);
    }

    #[test]
    fn test_new_registry_is_declared() {
        let registry = ConfigRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.stage(), LoadStage::Declared);
    }
}
