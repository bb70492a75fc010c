use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sheetdb_model::{format_date, parse_float, FieldType, FieldValue};
use thiserror::Error;

/// Why a value could not be converted to or from a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("not a number")]
    NotANumber,
    #[error("not a boolean")]
    NotABoolean,
    #[error("not a date")]
    NotADate,
    /// A boolean field was given a value with no boolean reading.
    #[error("invalid boolean literal")]
    InvalidBooleanLiteral,
}

pub type CoercionResult<T> = Result<T, CoercionError>;

/// Read a raw cell as `field_type`.
///
/// Empty cells are not special here: callers decide whether an empty cell
/// becomes `null` before coercing.
pub fn coerce(raw: &str, field_type: FieldType) -> CoercionResult<FieldValue> {
    match field_type {
        FieldType::String => Ok(FieldValue::String(raw.to_string())),
        FieldType::Number => {
            let n = parse_float(raw);
            if n.is_nan() {
                Err(CoercionError::NotANumber)
            } else {
                Ok(FieldValue::Number(n))
            }
        }
        FieldType::Boolean => parse_bool(raw)
            .map(FieldValue::Boolean)
            .ok_or(CoercionError::NotABoolean),
        FieldType::Date => parse_date(raw)
            .map(FieldValue::Date)
            .ok_or(CoercionError::NotADate),
    }
}

/// `true`/`1` and `false`/`0`, case-insensitively.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("true") || s == "1" {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") || s == "0" {
        Some(false)
    } else {
        None
    }
}

/// Parse the date and date-time spellings a spreadsheet cell commonly holds.
///
/// Strings without an offset are read as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const DATE_TIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %I:%M:%S %p",
        "%m/%d/%Y %I:%M %p",
    ];
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%B %d, %Y",
        "%d %B %Y",
    ];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
        }
    }

    // A bare year (`2024`) is the first instant of that year.
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt));
    }

    None
}

/// Render a resolved value as the text written into a cell of `field_type`.
///
/// `Null` stays `None`.
pub fn to_cell(value: &FieldValue, field_type: FieldType) -> CoercionResult<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    let text = match field_type {
        FieldType::String | FieldType::Number => value.to_string(),
        FieldType::Boolean => {
            let b = match value {
                FieldValue::Boolean(b) => *b,
                FieldValue::String(s) => {
                    parse_bool(s).ok_or(CoercionError::InvalidBooleanLiteral)?
                }
                FieldValue::Number(n) if *n == 1.0 => true,
                FieldValue::Number(n) if *n == 0.0 => false,
                _ => return Err(CoercionError::InvalidBooleanLiteral),
            };
            String::from(if b { "TRUE" } else { "FALSE" })
        }
        FieldType::Date => {
            let date = match value {
                FieldValue::Date(d) => *d,
                FieldValue::String(s) => parse_date(s).ok_or(CoercionError::NotADate)?,
                FieldValue::Number(ms) if ms.is_finite() => {
                    DateTime::<Utc>::from_timestamp_millis(*ms as i64)
                        .ok_or(CoercionError::NotADate)?
                }
                _ => return Err(CoercionError::NotADate),
            };
            format_date(&date)
        }
    };
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn numbers_use_parse_float() {
        assert_eq!(coerce("42", FieldType::Number), Ok(FieldValue::Number(42.0)));
        assert_eq!(coerce(" 3.5kg", FieldType::Number), Ok(FieldValue::Number(3.5)));
        assert_eq!(coerce("thirty", FieldType::Number), Err(CoercionError::NotANumber));
        assert_eq!(coerce("", FieldType::Number), Err(CoercionError::NotANumber));
    }

    #[test]
    fn booleans_accept_words_and_digits() {
        for (raw, expected) in [
            ("TRUE", true),
            ("true", true),
            ("1", true),
            ("False", false),
            ("0", false),
        ] {
            assert_eq!(
                coerce(raw, FieldType::Boolean),
                Ok(FieldValue::Boolean(expected)),
                "{raw}"
            );
        }
        assert_eq!(coerce("yes", FieldType::Boolean), Err(CoercionError::NotABoolean));
    }

    #[test]
    fn dates_in_common_spellings() {
        let midnight = utc("2024-01-15T00:00:00Z");
        for raw in ["2024-01-15", "2024/01/15", "01/15/2024", "January 15, 2024", "15 Jan 2024"] {
            assert_eq!(parse_date(raw), Some(midnight), "{raw}");
        }
        assert_eq!(
            parse_date("2024-01-15T10:30:00+02:00"),
            Some(utc("2024-01-15T08:30:00Z"))
        );
        assert_eq!(parse_date("2024-01-15 10:30:00"), Some(utc("2024-01-15T10:30:00Z")));
        assert_eq!(parse_date("1/15/2024 2:05 PM"), Some(utc("2024-01-15T14:05:00Z")));
        assert_eq!(parse_date("2024"), Some(utc("2024-01-01T00:00:00Z")));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn cells_are_written_per_type() {
        assert_eq!(to_cell(&FieldValue::Null, FieldType::Number), Ok(None));
        assert_eq!(to_cell(&30.into(), FieldType::Number), Ok(Some("30".into())));
        assert_eq!(to_cell(&"x".into(), FieldType::String), Ok(Some("x".into())));
        assert_eq!(to_cell(&true.into(), FieldType::Boolean), Ok(Some("TRUE".into())));
        assert_eq!(to_cell(&"false".into(), FieldType::Boolean), Ok(Some("FALSE".into())));
        assert_eq!(
            to_cell(&"maybe".into(), FieldType::Boolean),
            Err(CoercionError::InvalidBooleanLiteral)
        );
        assert_eq!(
            to_cell(&"2024-01-15".into(), FieldType::Date),
            Ok(Some("2024-01-15T00:00:00.000Z".into()))
        );
        assert_eq!(to_cell(&true.into(), FieldType::Date), Err(CoercionError::NotADate));
    }
}
