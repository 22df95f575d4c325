//! Command-line flag overrides.
//!
//! Flags take one or two leading hyphens and an optional `=value` in the same
//! argument: `--port=9100`, `-port=9100`, `--verbose`. Names are matched
//! case-insensitively and hyphens are equivalent to underscores. There are no
//! short options and `--name value` is not supported; `value` would be treated
//! as a positional argument and ignored.

use std::sync::OnceLock;

use regex::Regex;

use crate::registry::{canonical_key, ConfigRegistry, LoadStage};
use crate::ConfigError;

fn flag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^--?([A-Za-z0-9_-]+)(?:=(.*))?$").expect("flag pattern is a valid regex")
    })
}

/// A command-line argument recognized as a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag<'a> {
    /// Canonical key the flag refers to.
    pub key: String,
    /// The value after `=`, or `""` for a bare flag.
    pub value: &'a str,
}

/// Splits an argument into a flag, or returns `None` for positional arguments.
///
/// # Example
///
/// ```
/// use keystone_config::parse_flag;
///
/// let flag = parse_flag("--read-timeout=5s").unwrap();
/// assert_eq!(flag.key, "READ_TIMEOUT");
/// assert_eq!(flag.value, "5s");
///
/// assert!(parse_flag("positional").is_none());
/// ```
#[must_use]
pub fn parse_flag(arg: &str) -> Option<Flag<'_>> {
    let captures = flag_pattern().captures(arg)?;
    let name = captures.get(1)?.as_str();
    let value = captures.get(2).map_or("", |m| m.as_str());
    Some(Flag {
        key: canonical_key(name),
        value,
    })
}

impl ConfigRegistry {
    /// Applies command-line overrides.
    ///
    /// `args` must not include the program name. Runs after
    /// [`apply_env`](Self::apply_env), so flags win over the environment; a
    /// repeated flag keeps its last value. Returns the number of flags
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnrecognizedFlag`] at the first flag that
    /// names no declared entry.
    pub fn apply_args<I, S>(&mut self, args: I) -> Result<usize, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.advance(LoadStage::EnvApplied, LoadStage::CmdLineApplied)?;

        let mut applied = 0;
        for arg in args {
            let arg = arg.as_ref();
            let Some(flag) = parse_flag(arg) else {
                continue;
            };
            let Some(entry) = self.entries.get_mut(&flag.key) else {
                return Err(ConfigError::unrecognized_flag(arg));
            };
            entry.set_override(flag.value);
            applied += 1;
            tracing::debug!(key = %flag.key, kind = %entry.kind(), "command line override applied");
        }

        Ok(applied)
    }
}
