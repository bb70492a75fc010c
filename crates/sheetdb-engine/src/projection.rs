use std::collections::HashSet;

use serde::Deserialize;
use sheetdb_model::{Record, Schema};

use crate::error::{OperationError, Result};

/// `select` / `omit` applied to materialized records.
///
/// Keys may be given as header names or as schema aliases; both resolve to
/// the property name the records carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Projection {
    pub select: Option<Vec<String>>,
    pub omit: Option<Vec<String>>,
}

impl Projection {
    pub fn new(select: Option<Vec<String>>, omit: Option<Vec<String>>) -> Self {
        Self { select, omit }
    }

    pub fn select<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::new(Some(keys.into_iter().map(Into::into).collect()), None)
    }

    pub fn omit<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::new(None, Some(keys.into_iter().map(Into::into).collect()))
    }

    pub fn is_identity(&self) -> bool {
        self.select.is_none() && self.omit.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.select.is_some() && self.omit.is_some() {
            return Err(OperationError::SelectOmitConflict);
        }
        Ok(())
    }

    pub fn apply(&self, mut records: Vec<Record>, schema: &Schema) -> Result<Vec<Record>> {
        self.validate()?;
        let (keys, keep) = match (&self.select, &self.omit) {
            (Some(keys), None) => (keys, true),
            (None, Some(keys)) => (keys, false),
            _ => return Ok(records),
        };

        let resolved: HashSet<&str> = keys.iter().map(|k| schema.output_key(k)).collect();
        for record in &mut records {
            record.retain(|key, _| resolved.contains(key) == keep);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetdb_model::{FieldType, SchemaField};

    #[test]
    fn identity_without_keys() {
        let records = vec![Record::new().with("a", 1)];
        let out = Projection::default().apply(records.clone(), &Schema::default()).unwrap();
        assert_eq!(out, records);
    }

    #[test]
    fn header_names_resolve_to_aliases() {
        let schema = Schema::new(vec![SchemaField::new("e_mail", FieldType::String).alias("email")]);
        let records = vec![Record::new().with("name", "Ada").with("email", "ada@example.com")];

        let by_header = Projection::select(["e_mail"]).apply(records.clone(), &schema).unwrap();
        let by_alias = Projection::select(["email"]).apply(records, &schema).unwrap();
        assert_eq!(by_header, by_alias);
        assert_eq!(by_header[0].keys().collect::<Vec<_>>(), vec!["email"]);
    }
}
