use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::column_letter;

/// Errors that can occur when validating a table's header row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("header row is empty")]
    NoHeadersFound,
    #[error("header in column {column} is empty")]
    InvalidHeader { column: String },
    #[error("duplicated header `{0}`")]
    DuplicatedHeader(String),
}

/// A named column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderColumn {
    pub name: String,
    /// 0-indexed physical column (`0` is column `A`).
    pub column_index: u32,
}

impl HeaderColumn {
    pub fn new(name: impl Into<String>, column_index: u32) -> Self {
        Self {
            name: name.into(),
            column_index,
        }
    }

    /// Column letters (`A`, `B`, ..., `AA`).
    pub fn letter(&self) -> String {
        column_letter(self.column_index)
    }
}

/// Validate the raw cells of a header row and number them.
///
/// Names are trimmed. The row must be non-empty, every name must be non-empty
/// and names must be unique (the first repeat in scan order is reported).
pub fn build_header_columns<S: AsRef<str>>(cells: &[S]) -> Result<Vec<HeaderColumn>, HeaderError> {
    if cells.is_empty() {
        return Err(HeaderError::NoHeadersFound);
    }

    let mut seen = HashSet::with_capacity(cells.len());
    let mut out = Vec::with_capacity(cells.len());
    for (idx, cell) in cells.iter().enumerate() {
        let column_index = idx as u32;
        let name = cell.as_ref().trim();
        if name.is_empty() {
            return Err(HeaderError::InvalidHeader {
                column: column_letter(column_index),
            });
        }
        if !seen.insert(name) {
            return Err(HeaderError::DuplicatedHeader(name.to_string()));
        }
        out.push(HeaderColumn::new(name, column_index));
    }
    Ok(out)
}

/// Highest physical column covered by `headers`.
pub fn last_column(headers: &[HeaderColumn]) -> Option<u32> {
    headers.iter().map(|h| h.column_index).max()
}

pub fn find_header<'a>(headers: &'a [HeaderColumn], name: &str) -> Option<&'a HeaderColumn> {
    headers.iter().find(|h| h.name == name)
}
