//! Typed configuration values and the raw-string parser.
//!
//! Every configuration entry carries a [`ValueKind`] fixed at declaration
//! time. Raw strings from the environment or the command line are turned into
//! a [`Value`] of that kind by [`parse_value`], which never fails: malformed
//! input degrades to the kind's zero value.

use std::fmt;
use std::time::Duration;

/// The kind of a configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Signed 64-bit integer.
    Int,
    /// Verbatim string.
    String,
    /// Comma-separated list of strings.
    StringList,
    /// Boolean flag.
    Bool,
    /// Time span such as `5s` or `1h30m`.
    Duration,
}

impl ValueKind {
    /// Returns the zero value for this kind.
    #[must_use]
    pub fn zero(self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::String => Value::Str(String::new()),
            Self::StringList => Value::StrList(Vec::new()),
            Self::Bool => Value::Bool(false),
            Self::Duration => Value::Duration(Duration::ZERO),
        }
    }

    /// Returns the name used in diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
            Self::StringList => "string list",
            Self::Bool => "bool",
            Self::Duration => "duration",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// An integer value.
    Int(i64),
    /// A string value.
    Str(String),
    /// A list of strings.
    StrList(Vec<String>),
    /// A boolean value.
    Bool(bool),
    /// A duration value.
    Duration(Duration),
}

impl Value {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Str(_) => ValueKind::String,
            Self::StrList(_) => ValueKind::StringList,
            Self::Bool(_) => ValueKind::Bool,
            Self::Duration(_) => ValueKind::Duration,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
            Self::StrList(v) => f.write_str(&v.join(",")),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Duration(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::StrList(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Self::Duration(v)
    }
}

/// Parses a raw string into a value of the given kind.
///
/// Never fails:
///
/// - `Int`: base-10, optional sign; anything unparseable (overflow included) is `0`
/// - `String`: verbatim
/// - `StringList`: split on `,` without trimming, so `""` becomes `[""]`
/// - `Bool`: `""` or anything starting with `t`/`T` is `true`, the rest `false`
/// - `Duration`: see [`parse_duration`]; unparseable or negative input is zero
///
/// # Example
///
/// ```
/// use keystone_config::{parse_value, Value, ValueKind};
///
/// assert_eq!(parse_value("42", ValueKind::Int), Value::Int(42));
/// assert_eq!(parse_value("", ValueKind::Bool), Value::Bool(true));
/// assert_eq!(parse_value("nope", ValueKind::Int), Value::Int(0));
/// ```
#[must_use]
pub fn parse_value(raw: &str, kind: ValueKind) -> Value {
    match kind {
        ValueKind::Int => Value::Int(raw.parse().unwrap_or(0)),
        ValueKind::String => Value::Str(raw.to_string()),
        ValueKind::StringList => Value::StrList(raw.split(',').map(str::to_string).collect()),
        ValueKind::Bool => Value::Bool(raw.is_empty() || raw.to_lowercase().starts_with('t')),
        ValueKind::Duration => Value::Duration(parse_duration(raw).unwrap_or(Duration::ZERO)),
    }
}

/// Parses a duration expression like `300ms`, `5s`, `1h30m` or `1.5h`.
///
/// The grammar is an optional sign followed by one or more
/// `<decimal><unit>` groups, with units `ns`, `us` (`µs`, `μs`), `ms`, `s`,
/// `m` and `h`. The bare literal `0` is also accepted.
///
/// Returns `None` for malformed input or a total above `i64::MAX`
/// nanoseconds. Negative expressions parse but clamp to zero, since
/// [`Duration`] is unsigned.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use keystone_config::parse_duration;
///
/// assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
/// assert_eq!(parse_duration("-5s"), Some(Duration::ZERO));
/// assert_eq!(parse_duration("5"), None);
/// ```
#[must_use]
pub fn parse_duration(input: &str) -> Option<Duration> {
    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, after) = split_digits(rest);
        let (fraction, after) = match after.strip_prefix('.') {
            Some(stripped) => split_digits(stripped),
            None => ("", after),
        };
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }

        let unit_end = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, next) = after.split_at(unit_end);
        let scale = unit_nanos(unit)?;

        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        total = total.checked_add(whole.checked_mul(scale)?)?;
        total = total.checked_add(fraction_nanos(fraction, scale))?;
        if total > i64::MAX as u128 {
            return None;
        }

        rest = next;
    }

    if negative {
        return Some(Duration::ZERO);
    }
    u64::try_from(total).ok().map(Duration::from_nanos)
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

// Digits past the 18th cannot change the result at nanosecond precision.
fn fraction_nanos(fraction: &str, scale: u128) -> u128 {
    let mut numerator: u128 = 0;
    let mut denominator: u128 = 1;
    for digit in fraction.bytes().take(18) {
        numerator = numerator * 10 + u128::from(digit - b'0');
        denominator *= 10;
    }
    numerator * scale / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_value("8080", ValueKind::Int), Value::Int(8080));
        assert_eq!(parse_value("-12", ValueKind::Int), Value::Int(-12));
        assert_eq!(parse_value("+7", ValueKind::Int), Value::Int(7));
    }

    #[test]
    fn test_parse_int_degrades_to_zero() {
        assert_eq!(parse_value("", ValueKind::Int), Value::Int(0));
        assert_eq!(parse_value("12abc", ValueKind::Int), Value::Int(0));
        assert_eq!(parse_value(" 12", ValueKind::Int), Value::Int(0));
        assert_eq!(parse_value("99999999999999999999", ValueKind::Int), Value::Int(0));
    }

    #[test]
    fn test_parse_string_verbatim() {
        assert_eq!(
            parse_value("  Mixed Case, commas  ", ValueKind::String),
            Value::Str("  Mixed Case, commas  ".to_string())
        );
    }

    #[test]
    fn test_parse_string_list() {
        assert_eq!(
            parse_value("a,b,c", ValueKind::StringList),
            Value::StrList(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(
            parse_value("a, b", ValueKind::StringList),
            Value::StrList(vec!["a".into(), " b".into()])
        );
    }

    #[test]
    fn test_parse_empty_string_list_has_one_empty_element() {
        assert_eq!(
            parse_value("", ValueKind::StringList),
            Value::StrList(vec![String::new()])
        );
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_value("", ValueKind::Bool), Value::Bool(true));
        assert_eq!(parse_value("true", ValueKind::Bool), Value::Bool(true));
        assert_eq!(parse_value("TRUE", ValueKind::Bool), Value::Bool(true));
        assert_eq!(parse_value("t", ValueKind::Bool), Value::Bool(true));
        assert_eq!(parse_value("tomato", ValueKind::Bool), Value::Bool(true));

        assert_eq!(parse_value("false", ValueKind::Bool), Value::Bool(false));
        assert_eq!(parse_value("yes", ValueKind::Bool), Value::Bool(false));
        assert_eq!(parse_value("1", ValueKind::Bool), Value::Bool(false));
        assert_eq!(parse_value(" true", ValueKind::Bool), Value::Bool(false));
    }

    #[test]
    fn test_parse_duration_value() {
        assert_eq!(
            parse_value("5s", ValueKind::Duration),
            Value::Duration(Duration::from_secs(5))
        );
        assert_eq!(
            parse_value("", ValueKind::Duration),
            Value::Duration(Duration::ZERO)
        );
        assert_eq!(
            parse_value("bogus", ValueKind::Duration),
            Value::Duration(Duration::ZERO)
        );
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("10ns"), Some(Duration::from_nanos(10)));
        assert_eq!(parse_duration("10us"), Some(Duration::from_micros(10)));
        assert_eq!(parse_duration("10µs"), Some(Duration::from_micros(10)));
        assert_eq!(parse_duration("10μs"), Some(Duration::from_micros(10)));
        assert_eq!(parse_duration("300ms"), Some(Duration::from_millis(300)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("3h"), Some(Duration::from_secs(3 * 3600)));
    }

    #[test]
    fn test_parse_duration_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1.5h"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration(".5s"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("1.s"), Some(Duration::from_secs(1)));
        assert_eq!(
            parse_duration("2h45m30.5s"),
            Some(Duration::from_millis((2 * 3600 + 45 * 60 + 30) * 1000 + 500))
        );
    }

    #[test]
    fn test_parse_duration_signs() {
        assert_eq!(parse_duration("+5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("-5s"), Some(Duration::ZERO));
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration("-0"), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_duration_rejects_malformed() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("-"), None);
        assert_eq!(parse_duration("5"), None);
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration(".s"), None);
        assert_eq!(parse_duration("5x"), None);
        assert_eq!(parse_duration("5 s"), None);
        assert_eq!(parse_duration("1.5.3h"), None);
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert_eq!(parse_duration("9223372036854775807ns"), Some(Duration::from_nanos(i64::MAX as u64)));
        assert_eq!(parse_duration("9223372036854775808ns"), None);
        assert_eq!(parse_duration("3000000h"), None);
    }

    #[test]
    fn test_value_kind_roundtrip() {
        for kind in [
            ValueKind::Int,
            ValueKind::String,
            ValueKind::StringList,
            ValueKind::Bool,
            ValueKind::Duration,
        ] {
            assert_eq!(kind.zero().kind(), kind);
        }
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(
            Value::StrList(vec!["GET".into(), "POST".into()]).to_string(),
            "GET,POST"
        );
        assert_eq!(Value::Duration(Duration::from_secs(5)).to_string(), "5s");
    }

    proptest! {
        #[test]
        fn prop_parse_value_keeps_declared_kind(raw in ".*", idx in 0usize..5) {
            let kind = [
                ValueKind::Int,
                ValueKind::String,
                ValueKind::StringList,
                ValueKind::Bool,
                ValueKind::Duration,
            ][idx];
            prop_assert_eq!(parse_value(&raw, kind).kind(), kind);
        }

        #[test]
        fn prop_int_matches_std_parse(n in any::<i64>()) {
            prop_assert_eq!(parse_value(&n.to_string(), ValueKind::Int), Value::Int(n));
        }

        #[test]
        fn prop_string_list_joins_back(raw in "[a-z,]{0,24}") {
            match parse_value(&raw, ValueKind::StringList) {
                Value::StrList(items) => prop_assert_eq!(items.join(","), raw),
                other => prop_assert!(false, "unexpected value {:?}", other),
            }
        }

        #[test]
        fn prop_whole_seconds(secs in 0u64..1_000_000) {
            prop_assert_eq!(parse_duration(&format!("{secs}s")), Some(Duration::from_secs(secs)));
        }
    }
}
