//! Parameter Schema and Values
//!
//! Every transform type publishes an immutable [`ParameterTable`] built once
//! on first use. Each instance keeps its current values in a
//! [`ParameterValues`] map, stored in the canonical spelling its kernel
//! reports (`"0256"` is kept as `"256"`).

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Documentation and default of one parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterTraits {
    pub description: &'static str,
    pub default_value: &'static str,
}

/// Immutable per-transform-type schema, in declaration order
#[derive(Debug, Default)]
pub struct ParameterTable {
    entries: Vec<(&'static str, ParameterTraits)>,
}

impl ParameterTable {
    /// Build from `(name, description, default)` triples
    pub fn new(entries: &[(&'static str, &'static str, &'static str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|&(name, description, default_value)| {
                    (
                        name,
                        ParameterTraits {
                            description,
                            default_value,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterTraits> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, traits)| traits)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParameterTraits)> {
        self.entries.iter().map(|(name, traits)| (*name, traits))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Declare a transform's parameter schema as a lazily built `&'static ParameterTable`
///
/// ```ignore
/// fn parameters() -> &'static ParameterTable {
///     parameter_table! {
///         "base" => ("Logarithm base (e, 2 or 10)", "e"),
///     }
/// }
/// ```
#[macro_export]
macro_rules! parameter_table {
    ($($name:literal => ($description:literal, $default:literal)),* $(,)?) => {{
        static TABLE: ::std::sync::OnceLock<$crate::ParameterTable> = ::std::sync::OnceLock::new();
        TABLE.get_or_init(|| $crate::ParameterTable::new(&[$(($name, $description, $default)),*]))
    }};
}

/// Current textual parameter values of one transform instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterValues {
    values: BTreeMap<String, String>,
}

impl ParameterValues {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub(crate) fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Marker returned by kernel setters when a value fails parsing or range checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidValue;

/// Parse a signed integer constrained to `range`
pub fn parse_int(value: &str, range: RangeInclusive<i64>) -> Result<i64, InvalidValue> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|v| range.contains(v))
        .ok_or(InvalidValue)
}

/// Parse an unsigned size constrained to `range`
pub fn parse_size(value: &str, range: RangeInclusive<usize>) -> Result<usize, InvalidValue> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|v| range.contains(v))
        .ok_or(InvalidValue)
}

/// Parse a finite float constrained to `range`
pub fn parse_float(value: &str, range: RangeInclusive<f32>) -> Result<f32, InvalidValue> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && range.contains(v))
        .ok_or(InvalidValue)
}

/// Map `value` through a fixed string-to-value table
pub fn parse_enum<T: Copy>(value: &str, table: &[(&str, T)]) -> Result<T, InvalidValue> {
    let value = value.trim();
    table
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, v)| *v)
        .ok_or(InvalidValue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> &'static ParameterTable {
        parameter_table! {
            "length" => ("Frame length in samples", "512"),
            "type" => ("Window type", "hamming"),
        }
    }

    #[test]
    fn test_table_is_built_once() {
        assert!(std::ptr::eq(table(), table()));
        assert_eq!(table().len(), 2);
        assert_eq!(table().get("length").unwrap().default_value, "512");
        assert!(!table().contains("step"));
    }

    #[test]
    fn test_values_overwrite_by_name() {
        let mut values = ParameterValues::default();
        values.set("length", "512");
        values.set("type", "hamming");
        values.set("length", "256");
        assert_eq!(values.get("length"), Some("256"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_parse_int_bounds() {
        assert_eq!(parse_int("42", 0..=100), Ok(42));
        assert_eq!(parse_int(" -3 ", -5..=5), Ok(-3));
        assert_eq!(parse_int("101", 0..=100), Err(InvalidValue));
        assert_eq!(parse_int("abc", 0..=100), Err(InvalidValue));
    }

    #[test]
    fn test_parse_size_rejects_negative() {
        assert_eq!(parse_size("16", 1..=32), Ok(16));
        assert_eq!(parse_size("-1", 0..=32), Err(InvalidValue));
        assert_eq!(parse_size("0", 1..=32), Err(InvalidValue));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("0.5", 0.01..=100.0), Ok(0.5));
        assert_eq!(parse_float("1e1", 0.01..=100.0), Ok(10.0));
        assert_eq!(parse_float("0", 0.01..=100.0), Err(InvalidValue));
        assert_eq!(parse_float("NaN", 0.01..=100.0), Err(InvalidValue));
    }

    #[test]
    fn test_parse_enum() {
        let table = [("e", 0), ("2", 1), ("10", 2)];
        assert_eq!(parse_enum("10", &table), Ok(2));
        assert_eq!(parse_enum("3", &table), Err(InvalidValue));
    }
}
