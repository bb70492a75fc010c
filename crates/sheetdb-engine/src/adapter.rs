use sheetdb_model::{last_column, FieldType, FieldValue, HeaderColumn, Record, Schema, SchemaField};

use crate::coerce::{coerce, to_cell, CoercionError};
use crate::error::{OperationError, Result};

/// Converts between raw rows and typed records for one table.
#[derive(Debug, Clone, Copy)]
pub struct RecordAdapter<'a> {
    headers: &'a [HeaderColumn],
    schema: &'a Schema,
}

impl<'a> RecordAdapter<'a> {
    pub fn new(headers: &'a [HeaderColumn], schema: &'a Schema) -> Self {
        Self { headers, schema }
    }

    pub fn headers(&self) -> &'a [HeaderColumn] {
        self.headers
    }

    /// Number of cells in a written row.
    pub fn width(&self) -> usize {
        last_column(self.headers).map_or(0, |c| c as usize + 1)
    }

    /// The header backing a record property, looked up through schema aliases.
    pub fn header_for_key(&self, key: &str) -> Option<&'a HeaderColumn> {
        self.headers
            .iter()
            .find(|h| self.schema.output_key(&h.name) == key)
    }

    /// Build a typed record from a raw row. Missing trailing cells read as empty.
    ///
    /// `required` is not enforced on read.
    pub fn to_record<S: AsRef<str>>(&self, row: &[S]) -> Result<Record> {
        let mut record = Record::with_capacity(self.headers.len());
        for header in self.headers {
            let raw = row
                .get(header.column_index as usize)
                .map_or("", |cell| cell.as_ref());
            let field = self.schema.get(&header.name);
            let value = read_cell(header, field, raw)?;
            record.insert(self.schema.output_key(&header.name), value);
        }
        Ok(record)
    }

    /// Like [`RecordAdapter::to_record`] for a row that was just written:
    /// cells that were left unwritten read as `null`.
    pub fn to_written_record(&self, row: &[Option<String>]) -> Result<Record> {
        let mut record = Record::with_capacity(self.headers.len());
        for header in self.headers {
            let value = match row.get(header.column_index as usize) {
                Some(Some(raw)) => read_cell(header, self.schema.get(&header.name), raw)?,
                _ => FieldValue::Null,
            };
            record.insert(self.schema.output_key(&header.name), value);
        }
        Ok(record)
    }

    /// Lay a record out as a row of cells in physical column order.
    ///
    /// Gaps between header columns are empty strings; `None` marks a cell
    /// whose resolved value is `null`. Properties without a header are ignored.
    pub fn from_record(&self, record: &Record) -> Result<Vec<Option<String>>> {
        let mut row = vec![Some(String::new()); self.width()];
        for header in self.headers {
            let value = record.get(self.schema.output_key(&header.name));
            row[header.column_index as usize] = self.write_cell(header, value)?;
        }
        Ok(row)
    }

    /// Resolve and render the cell written for one header.
    ///
    /// `value` is `None` when the record does not carry the property at all.
    pub fn write_cell(
        &self,
        header: &HeaderColumn,
        value: Option<&FieldValue>,
    ) -> Result<Option<String>> {
        let Some(field) = self.schema.get(&header.name) else {
            return Ok(value.and_then(|v| (!v.is_null()).then(|| v.to_string())));
        };

        let resolved = resolve_write_value(field, value)?;
        to_cell(&resolved, field.field_type).map_err(|err| match err {
            CoercionError::InvalidBooleanLiteral => OperationError::InvalidBooleanValue {
                header: header.name.clone(),
                value: resolved.to_string(),
            },
            _ => OperationError::SchemaTypeMismatch {
                header: header.name.clone(),
                value: resolved.to_string(),
                expected: field.field_type,
            },
        })
    }
}

fn read_cell(header: &HeaderColumn, field: Option<&SchemaField>, raw: &str) -> Result<FieldValue> {
    let field_type = field.map_or(FieldType::String, |f| f.field_type);
    let nullable = field.is_some_and(|f| f.nullable);
    if raw.is_empty() && nullable {
        return Ok(FieldValue::Null);
    }
    coerce(raw, field_type).map_err(|_| OperationError::SchemaTypeMismatch {
        header: header.name.clone(),
        value: raw.to_string(),
        expected: field_type,
    })
}

/// Pick the value written for a schema field.
///
/// `value` is `None` when the property is absent from the record.
pub fn resolve_write_value(field: &SchemaField, value: Option<&FieldValue>) -> Result<FieldValue> {
    if field.nullable && field.required {
        return Err(OperationError::NullableRequiredConflict(field.key.clone()));
    }
    match value {
        Some(v) if v.is_nullish() && !field.nullable => {
            Err(OperationError::NullableViolation(field.key.clone()))
        }
        Some(v) => Ok(v.clone()),
        None if field.nullable => Ok(field.default.clone().unwrap_or(FieldValue::Null)),
        None => match &field.default {
            Some(default) => Ok(default.clone()),
            None if field.required => Err(OperationError::FieldRequiredNoDefault(field.key.clone())),
            None => Ok(FieldValue::Null),
        },
    }
}
