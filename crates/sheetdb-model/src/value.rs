use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

/// A typed field of an application record.
///
/// Cells are strings on the wire; a [`crate::Schema`] decides which variant a
/// cell is coerced into. `Null` is only produced for nullable fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FieldValue {
    #[default]
    Null,
    String(String),
    /// IEEE-754 double precision number.
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
}

impl FieldValue {
    /// Returns true if the value is [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// `null` or the empty string: the two values that leave a cell empty.
    pub fn is_nullish(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// JSON form used for serde interop.
    ///
    /// Integral numbers are emitted as JSON integers so records deserialize
    /// cleanly into structs with integer fields.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::String(s) => JsonValue::String(s.clone()),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    JsonValue::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(JsonValue::Number)
                        .unwrap_or(JsonValue::Null)
                }
            }
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
            FieldValue::Date(d) => JsonValue::String(format_date(d)),
        }
    }

    /// Inverse of [`FieldValue::to_json`]. Dates arrive as strings and are
    /// only parsed once a schema says the field is a date.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Boolean(b),
            JsonValue::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Number),
            JsonValue::String(s) => FieldValue::String(s),
            other @ (JsonValue::Array(_) | JsonValue::Object(_)) => {
                FieldValue::String(other.to_string())
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Number(n) => f.write_str(&format_number(*n)),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Date(d) => f.write_str(&format_date(d)),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(FieldValue::from_json)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Render a number the way it is written back into a cell.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n.is_sign_negative() {
            "-Infinity".to_string()
        } else {
            "Infinity".to_string()
        }
    } else {
        n.to_string()
    }
}

/// ISO-8601 UTC with millisecond precision (`2024-01-15T09:30:00.000Z`).
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Lenient number parsing with JavaScript `parseFloat` semantics.
///
/// Leading whitespace is skipped and the longest numeric prefix is used
/// (`"30px"` is `30`). Text without a numeric prefix yields `NaN`.
pub fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut idx = 0usize;
    let negative = bytes.first() == Some(&b'-');
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        idx += 1;
    }
    if s[idx..].starts_with("Infinity") {
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    let mut digits = idx - int_start;

    if bytes.get(idx) == Some(&b'.') {
        let frac_start = idx + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > frac_start {
            digits += j - frac_start;
            idx = j;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(idx), Some(b'e' | b'E')) {
        let mut j = idx + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            idx = j;
        }
    }

    s[..idx].parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_float_takes_numeric_prefix() {
        assert_eq!(parse_float("42"), 42.0);
        assert_eq!(parse_float("  -3.5e2 apples"), -350.0);
        assert_eq!(parse_float("30px"), 30.0);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("7."), 7.0);
        assert_eq!(parse_float("1e"), 1.0);
        assert_eq!(parse_float("+Infinity"), f64::INFINITY);
        assert!(parse_float("thirty").is_nan());
        assert!(parse_float("").is_nan());
        assert!(parse_float("-").is_nan());
        assert!(parse_float(".").is_nan());
    }

    #[test]
    fn numbers_render_without_trailing_zeroes() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.25), "-0.25");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(FieldValue::from(12).to_string(), "12");
    }

    #[test]
    fn json_interop_keeps_integers_integral() {
        assert_eq!(FieldValue::Number(3.0).to_json(), serde_json::json!(3));
        assert_eq!(FieldValue::Number(2.5).to_json(), serde_json::json!(2.5));
        assert_eq!(
            FieldValue::from_json(serde_json::json!([1, 2])),
            FieldValue::String("[1,2]".to_string())
        );
    }
}
