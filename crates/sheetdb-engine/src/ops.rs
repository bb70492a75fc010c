use async_trait::async_trait;
use serde::Deserialize;
use sheetdb_model::{HeaderColumn, Record};

use crate::error::{OperationError, Result};
use crate::filter::WhereClause;
use crate::projection::Projection;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    #[serde(rename = "where")]
    pub where_clause: WhereClause,
    pub select: Option<Vec<String>>,
    pub omit: Option<Vec<String>>,
    /// Applied to matched rows after `offset`, before full rows are fetched.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Pre-resolved headers; resolved through the cache when empty.
    pub headers: Vec<HeaderColumn>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, where_clause: WhereClause) -> Self {
        self.where_clause = where_clause;
        self
    }

    pub fn select<I: IntoIterator<Item = K>, K: Into<String>>(mut self, keys: I) -> Self {
        self.select = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn omit<I: IntoIterator<Item = K>, K: Into<String>>(mut self, keys: I) -> Self {
        self.omit = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn headers(mut self, headers: Vec<HeaderColumn>) -> Self {
        self.headers = headers;
        self
    }

    pub fn projection(&self) -> Projection {
        Projection::new(self.select.clone(), self.omit.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InsertOptions {
    pub data: Vec<Record>,
    pub select: Option<Vec<String>>,
    pub omit: Option<Vec<String>>,
}

impl InsertOptions {
    pub fn new(data: Vec<Record>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn projection(&self) -> Projection {
        Projection::new(self.select.clone(), self.omit.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    #[serde(rename = "where")]
    pub where_clause: WhereClause,
    /// Properties to overwrite on every matched row; others are left untouched.
    pub data: Record,
    pub select: Option<Vec<String>>,
    pub omit: Option<Vec<String>>,
}

impl UpdateOptions {
    pub fn new(where_clause: WhereClause, data: Record) -> Self {
        Self {
            where_clause,
            data,
            ..Self::default()
        }
    }

    pub fn projection(&self) -> Projection {
        Projection::new(self.select.clone(), self.omit.clone())
    }
}

/// Options shared by clear and delete.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemoveOptions {
    #[serde(rename = "where")]
    pub where_clause: WhereClause,
    pub select: Option<Vec<String>>,
    pub omit: Option<Vec<String>>,
}

impl RemoveOptions {
    pub fn new(where_clause: WhereClause) -> Self {
        Self {
            where_clause,
            ..Self::default()
        }
    }

    pub fn projection(&self) -> Projection {
        Projection::new(self.select.clone(), self.omit.clone())
    }
}

pub type ClearOptions = RemoveOptions;
pub type DeleteOptions = RemoveOptions;

#[async_trait]
pub trait Finder {
    async fn find_many(&self, options: FindOptions) -> Result<Vec<Record>>;

    /// Like `find_many`, but fails with `MultipleRecordsFoundForUnique` when
    /// more than one row matches. `limit` and `offset` are ignored.
    async fn find_unique(&self, options: FindOptions) -> Result<Option<Record>>;

    async fn count(&self, where_clause: WhereClause) -> Result<usize>;

    async fn find_first(&self, options: FindOptions) -> Result<Option<Record>> {
        let options = FindOptions {
            limit: Some(1),
            ..options
        };
        Ok(self.find_many(options).await?.into_iter().next())
    }

    async fn find_first_or_throw(&self, options: FindOptions) -> Result<Record> {
        self.find_first(options)
            .await?
            .ok_or(OperationError::RecordNotFound)
    }

    async fn find_unique_or_throw(&self, options: FindOptions) -> Result<Record> {
        self.find_unique(options)
            .await?
            .ok_or(OperationError::RecordNotFound)
    }
}

#[async_trait]
pub trait Inserter {
    /// Append `data` after the last occupied row and return the written records.
    async fn insert(&self, options: InsertOptions) -> Result<Vec<Record>>;
}

#[async_trait]
pub trait Updater {
    async fn update(&self, options: UpdateOptions) -> Result<Vec<Record>>;
}

#[async_trait]
pub trait Clearer {
    /// Empty the matched rows in place. Returns the records as they were
    /// before clearing when the table is configured to return records.
    async fn clear(&self, options: ClearOptions) -> Result<Option<Vec<Record>>>;
}

#[async_trait]
pub trait Deleter {
    /// Remove the matched rows, shifting later rows up.
    async fn delete(&self, options: DeleteOptions) -> Result<Option<Vec<Record>>>;
}
