use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use sheetdb_model::{format_number, parse_float};
use thiserror::Error;

/// The named comparisons a `where` filter can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Equals,
    Not,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    Search,
    StartsWith,
    EndsWith,
}

impl Predicate {
    pub const ALL: [Predicate; 12] = [
        Predicate::Equals,
        Predicate::Not,
        Predicate::In,
        Predicate::NotIn,
        Predicate::Lt,
        Predicate::Lte,
        Predicate::Gt,
        Predicate::Gte,
        Predicate::Contains,
        Predicate::Search,
        Predicate::StartsWith,
        Predicate::EndsWith,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Predicate::Equals => "equals",
            Predicate::Not => "not",
            Predicate::In => "in",
            Predicate::NotIn => "notIn",
            Predicate::Lt => "lt",
            Predicate::Lte => "lte",
            Predicate::Gt => "gt",
            Predicate::Gte => "gte",
            Predicate::Contains => "contains",
            Predicate::Search => "search",
            Predicate::StartsWith => "startsWith",
            Predicate::EndsWith => "endsWith",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Evaluate against one cell.
    ///
    /// `search` compiles its pattern on every call here; filters go through
    /// [`Condition`] instead, which compiles once.
    pub fn evaluate(self, cell: &str, operand: &Operand) -> bool {
        match self {
            Predicate::Equals => operand.strict_equals(cell),
            Predicate::Not => !operand.strict_equals(cell),
            Predicate::In => match operand {
                Operand::List(items) => items.iter().any(|item| item.strict_equals(cell)),
                _ => false,
            },
            Predicate::NotIn => match operand {
                Operand::List(items) => !items.iter().any(|item| item.strict_equals(cell)),
                _ => true,
            },
            Predicate::Lt => number_cmp(cell, operand, |a, b| a < b),
            Predicate::Lte => number_cmp(cell, operand, |a, b| a <= b),
            Predicate::Gt => number_cmp(cell, operand, |a, b| a > b),
            Predicate::Gte => number_cmp(cell, operand, |a, b| a >= b),
            Predicate::Contains => text_match(cell, operand, |c, t| c.contains(t)),
            Predicate::StartsWith => text_match(cell, operand, |c, t| c.starts_with(t)),
            Predicate::EndsWith => text_match(cell, operand, |c, t| c.ends_with(t)),
            Predicate::Search => operand
                .to_text()
                .and_then(|pattern| compile_search(&pattern).ok())
                .is_some_and(|re| re.is_match(cell)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Operand>),
}

impl Operand {
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Operand::Null,
            JsonValue::Bool(b) => Operand::Bool(b),
            JsonValue::Number(n) => n.as_f64().map_or(Operand::Null, Operand::Number),
            JsonValue::String(s) => Operand::Text(s),
            JsonValue::Array(items) => {
                Operand::List(items.into_iter().map(Operand::from_json).collect())
            }
            other @ JsonValue::Object(_) => Operand::Text(other.to_string()),
        }
    }

    /// Cells are always text, so only a text operand can be strictly equal to one.
    fn strict_equals(&self, cell: &str) -> bool {
        matches!(self, Operand::Text(text) if text == cell)
    }

    fn to_number(&self) -> f64 {
        match self {
            Operand::Number(n) => *n,
            Operand::Text(s) => parse_float(s),
            Operand::Bool(b) => f64::from(u8::from(*b)),
            Operand::Null | Operand::List(_) => f64::NAN,
        }
    }

    fn to_text(&self) -> Option<String> {
        match self {
            Operand::Text(s) => Some(s.clone()),
            Operand::Number(n) => Some(format_number(*n)),
            Operand::Bool(b) => Some(b.to_string()),
            Operand::Null | Operand::List(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for Operand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Operand::from_json)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Text(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Text(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Number(value)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Number(f64::from(value))
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Bool(value)
    }
}

impl<T: Into<Operand>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Error)]
pub enum PredicateError {
    #[error("unknown predicate `{0}`")]
    Unknown(String),
    #[error("invalid search pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
}

/// A predicate bound to its operand, ready to test cells.
#[derive(Debug, Clone)]
pub struct Condition {
    predicate: Predicate,
    operand: Operand,
    pattern: Option<Regex>,
}

impl Condition {
    pub fn compile(name: &str, operand: Operand) -> Result<Self, PredicateError> {
        let predicate =
            Predicate::from_name(name).ok_or_else(|| PredicateError::Unknown(name.to_string()))?;
        let pattern = match (predicate, operand.to_text()) {
            (Predicate::Search, Some(source)) => {
                Some(
                    compile_search(&source).map_err(|err| PredicateError::InvalidPattern {
                        pattern: source,
                        source: Box::new(err),
                    })?,
                )
            }
            _ => None,
        };
        Ok(Self {
            predicate,
            operand,
            pattern,
        })
    }

    pub fn equals(text: impl Into<String>) -> Self {
        Self {
            predicate: Predicate::Equals,
            operand: Operand::Text(text.into()),
            pattern: None,
        }
    }

    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    pub fn test(&self, cell: &str) -> bool {
        match (&self.pattern, self.predicate) {
            (Some(re), Predicate::Search) => re.is_match(cell),
            // A search whose operand has no text form never matches.
            (None, Predicate::Search) => false,
            (_, predicate) => predicate.evaluate(cell, &self.operand),
        }
    }
}

fn compile_search(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source).case_insensitive(true).build()
}

fn number_cmp(cell: &str, operand: &Operand, cmp: impl Fn(f64, f64) -> bool) -> bool {
    // NaN on either side compares false.
    cmp(parse_float(cell), operand.to_number())
}

fn text_match(cell: &str, operand: &Operand, m: impl Fn(&str, &str) -> bool) -> bool {
    operand.to_text().is_some_and(|text| m(cell, &text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for predicate in Predicate::ALL {
            assert_eq!(Predicate::from_name(predicate.name()), Some(predicate));
        }
        assert_eq!(Predicate::from_name("NotIn"), None);
        assert_eq!(Predicate::from_name("between"), None);
    }

    #[test]
    fn equality_is_strict() {
        assert!(Predicate::Equals.evaluate("42", &"42".into()));
        assert!(!Predicate::Equals.evaluate("42", &42.into()));
        assert!(Predicate::Not.evaluate("42", &42.into()));
        assert!(Predicate::Equals.evaluate("", &"".into()));
    }

    #[test]
    fn membership() {
        let list = Operand::from(vec!["a", "b"]);
        assert!(Predicate::In.evaluate("a", &list));
        assert!(!Predicate::In.evaluate("c", &list));
        assert!(Predicate::NotIn.evaluate("c", &list));
        assert!(!Predicate::NotIn.evaluate("b", &list));

        assert!(!Predicate::In.evaluate("a", &"a".into()));
        assert!(Predicate::NotIn.evaluate("a", &"a".into()));
    }

    #[test]
    fn numeric_comparisons_parse_the_cell() {
        assert!(Predicate::Gt.evaluate("30px", &18.into()));
        assert!(Predicate::Gte.evaluate("18", &18.into()));
        assert!(Predicate::Lt.evaluate("-1.5", &"0".into()));
        assert!(Predicate::Lte.evaluate("1e2", &100.into()));
        assert!(!Predicate::Lt.evaluate("3", &3.into()));
    }

    #[test]
    fn numeric_comparisons_on_text_are_false() {
        for predicate in [Predicate::Lt, Predicate::Lte, Predicate::Gt, Predicate::Gte] {
            assert!(!predicate.evaluate("n/a", &0.into()), "{predicate}");
            assert!(!predicate.evaluate("", &0.into()), "{predicate}");
            assert!(!predicate.evaluate("5", &Operand::Null), "{predicate}");
        }
    }

    #[test]
    fn text_predicates_are_case_sensitive() {
        assert!(Predicate::Contains.evaluate("hello world", &"o w".into()));
        assert!(!Predicate::Contains.evaluate("hello world", &"O W".into()));
        assert!(Predicate::StartsWith.evaluate("user-42", &"user-".into()));
        assert!(Predicate::EndsWith.evaluate("user-42", &42.into()));
        assert!(!Predicate::EndsWith.evaluate("user-42", &Operand::Null));
    }

    #[test]
    fn search_is_a_case_insensitive_regex() {
        let cond = Condition::compile("search", "^ada\\b".into()).unwrap();
        assert!(cond.test("Ada Lovelace"));
        assert!(!cond.test("Adam"));

        // Metacharacters are not escaped.
        let dot = Condition::compile("search", "a.c".into()).unwrap();
        assert!(dot.test("ABC"));

        assert!(matches!(
            Condition::compile("search", "(".into()),
            Err(PredicateError::InvalidPattern { .. })
        ));
        assert!(matches!(
            Condition::compile("like", "x".into()),
            Err(PredicateError::Unknown(name)) if name == "like"
        ));
    }

    #[test]
    fn operands_from_json() {
        let operand: Operand = serde_json::from_str(r#"["a", 1, true, null]"#).unwrap();
        assert_eq!(
            operand,
            Operand::List(vec![
                Operand::Text("a".into()),
                Operand::Number(1.0),
                Operand::Bool(true),
                Operand::Null,
            ])
        );
    }
}
