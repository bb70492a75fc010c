use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::FieldValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field `{0}` cannot be both nullable and required")]
    NullableRequiredConflict(String),
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
}

/// Runtime type a cell is coerced into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-column typing rules.
///
/// `key` is the header name used for column lookup; `alias` (serialized as
/// `as`) renames the property on application records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub key: String,
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldValue>,
}

impl SchemaField {
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            alias: None,
            field_type,
            required: false,
            nullable: false,
            default: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Property name on application records.
    pub fn output_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.key)
    }
}

/// The typing rules of one table. Columns without an entry are plain,
/// non-nullable strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Entry for a header name.
    pub fn get(&self, key: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Record property name for a header name.
    pub fn output_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map_or(key, SchemaField::output_key)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.nullable && field.required {
                return Err(SchemaError::NullableRequiredConflict(field.key.clone()));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(SchemaError::DuplicateField(field.key.clone()));
            }
        }
        Ok(())
    }
}

impl From<Vec<SchemaField>> for Schema {
    fn from(fields: Vec<SchemaField>) -> Self {
        Self::new(fields)
    }
}

impl FromIterator<SchemaField> for Schema {
    fn from_iter<I: IntoIterator<Item = SchemaField>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
