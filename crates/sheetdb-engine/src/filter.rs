use std::collections::BTreeSet;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use sheetdb_model::{find_header, HeaderColumn};

use crate::error::{OperationError, Result};
use crate::predicate::{Condition, Operand, PredicateError};

/// The filter applied to one field of a `where` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Shorthand for `{"equals": literal}`.
    Literal(String),
    /// Named predicates, all of which must hold.
    Predicates(Vec<(String, Operand)>),
}

impl Filter {
    pub fn literal(value: impl Into<String>) -> Self {
        Filter::Literal(value.into())
    }

    pub fn op(name: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Filter::Predicates(vec![(name.into(), operand.into())])
    }

    /// Add another predicate. A literal becomes an explicit `equals` first.
    pub fn and(self, name: impl Into<String>, operand: impl Into<Operand>) -> Self {
        let mut predicates = match self {
            Filter::Literal(value) => vec![("equals".to_string(), Operand::Text(value))],
            Filter::Predicates(predicates) => predicates,
        };
        predicates.push((name.into(), operand.into()));
        Filter::Predicates(predicates)
    }

    fn compile(&self) -> std::result::Result<Vec<Condition>, PredicateError> {
        match self {
            Filter::Literal(value) => Ok(vec![Condition::equals(value.clone())]),
            Filter::Predicates(predicates) => predicates
                .iter()
                .map(|(name, operand)| Condition::compile(name, operand.clone()))
                .collect(),
        }
    }

    fn from_json(value: JsonValue) -> std::result::Result<Self, String> {
        match value {
            JsonValue::String(s) => Ok(Filter::Literal(s)),
            JsonValue::Object(map) => Ok(Filter::Predicates(
                map.into_iter()
                    .map(|(name, operand)| (name, Operand::from_json(operand)))
                    .collect(),
            )),
            JsonValue::Array(_) => Err("expected a string or a map of predicates".to_string()),
            scalar => Ok(Filter::Predicates(vec![(
                "equals".to_string(),
                Operand::from_json(scalar),
            )])),
        }
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Filter::Literal(value.to_string())
    }
}

impl From<String> for Filter {
    fn from(value: String) -> Self {
        Filter::Literal(value)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Filter::from_json(value).map_err(D::Error::custom)
    }
}

/// Per-field filters keyed by header name, ANDed together.
///
/// Deserializes from `{"status": "active", "age": {"gte": 18}}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    entries: Vec<(String, Filter)>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<String>, filter: impl Into<Filter>) -> Self {
        let key = key.into();
        let filter = filter.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = filter,
            None => self.entries.push((key, filter)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.entries.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn from_json(value: JsonValue) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Check every predicate name and search pattern without touching data.
    pub fn validate(&self) -> Result<()> {
        for (_, filter) in &self.entries {
            filter.compile().map_err(invalid_filter)?;
        }
        Ok(())
    }

    /// Fail with `InvalidWhereKey` for the first key that is not a header.
    pub fn check_keys<'h>(&self, headers: &'h [HeaderColumn]) -> Result<Vec<&'h HeaderColumn>> {
        self.keys()
            .map(|key| {
                find_header(headers, key)
                    .ok_or_else(|| OperationError::InvalidWhereKey(key.to_string()))
            })
            .collect()
    }
}

fn invalid_filter(err: PredicateError) -> OperationError {
    OperationError::InvalidWhereFilter(match err {
        PredicateError::Unknown(name) => name,
        PredicateError::InvalidPattern { pattern, .. } => format!("search: {pattern}"),
    })
}

impl<'de> Deserialize<'de> for WhereClause {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = serde_json::Map::deserialize(deserializer)?;
        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            let filter = Filter::from_json(value)
                .map_err(|msg| D::Error::custom(format!("field `{key}`: {msg}")))?;
            entries.push((key, filter));
        }
        Ok(Self { entries })
    }
}

impl<K: Into<String>, F: Into<Filter>> FromIterator<(K, F)> for WhereClause {
    fn from_iter<I: IntoIterator<Item = (K, F)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(WhereClause::new(), |clause, (key, filter)| clause.field(key, filter))
    }
}

/// The fetched data cells of one column, excluding the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleColumn {
    pub name: String,
    pub values: Vec<String>,
}

impl SingleColumn {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Computes the rows matching a [`WhereClause`] over column data.
///
/// Row positions are zero-based sheet row indices: the first data row under a
/// header in 1-based row `header_row` is position `header_row`.
#[derive(Debug)]
pub struct WhereEvaluator<'a> {
    columns: &'a [SingleColumn],
    conditions: Vec<(&'a SingleColumn, Vec<Condition>)>,
    header_row: u32,
}

impl<'a> WhereEvaluator<'a> {
    /// Bind `clause` to `columns`.
    ///
    /// Fails with `InvalidWhereKey` for the first key without a column, then
    /// with `InvalidWhereFilter` for the first predicate that does not compile.
    pub fn new(clause: &WhereClause, columns: &'a [SingleColumn], header_row: u32) -> Result<Self> {
        let mut bound = Vec::with_capacity(clause.len());
        for (key, filter) in clause.iter() {
            let column = columns
                .iter()
                .find(|c| c.name == key)
                .ok_or_else(|| OperationError::InvalidWhereKey(key.to_string()))?;
            bound.push((column, filter));
        }

        let mut conditions = Vec::with_capacity(bound.len());
        for (column, filter) in bound {
            conditions.push((column, filter.compile().map_err(invalid_filter)?));
        }

        Ok(Self {
            columns,
            conditions,
            header_row,
        })
    }

    /// Matching row positions in ascending order.
    pub fn matches(&self) -> Vec<u32> {
        if self.conditions.is_empty() {
            let rows = self.columns.first().map_or(0, |c| c.values.len()) as u32;
            return (0..rows).map(|i| self.header_row + i).collect();
        }

        let mut result: Option<BTreeSet<u32>> = None;
        for (column, conditions) in &self.conditions {
            let rows: BTreeSet<u32> = column
                .values
                .iter()
                .enumerate()
                .filter(|(_, cell)| conditions.iter().all(|c| c.test(cell)))
                .map(|(i, _)| self.header_row + i as u32)
                .collect();
            result = Some(match result {
                None => rows,
                Some(acc) => acc.intersection(&rows).copied().collect(),
            });
            if result.as_ref().is_some_and(BTreeSet::is_empty) {
                break;
            }
        }
        result.unwrap_or_default().into_iter().collect()
    }
}
