use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sheetdb_model::RangeParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("sheet not found: {0}")]
    SheetNotFound(String),
    #[error("range `{0}` does not name a sheet")]
    MissingSheet(String),
    #[error("invalid range `{range}`: {source}")]
    InvalidRange {
        range: String,
        #[source]
        source: RangeParseError,
    },
    #[error("row {index} is out of bounds for sheet `{sheet}`")]
    RowOutOfBounds { sheet: String, index: u32 },
    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// How written strings are interpreted by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputMode {
    /// Stored verbatim.
    Raw,
    /// Parsed as if typed into the grid (numbers, dates, formulas).
    #[default]
    UserEntered,
}

/// Values read back for one requested range, row-major.
///
/// Like the remote API it models, trailing empty cells of a row and trailing
/// empty rows are omitted, so rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

/// One range of a batched write. `None` cells are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeUpdate {
    pub range: String,
    pub values: Vec<Vec<Option<String>>>,
}

impl RangeUpdate {
    pub fn new(range: impl Into<String>, values: Vec<Vec<Option<String>>>) -> Self {
        Self {
            range: range.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    pub id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetMetadata {
    pub sheets: Vec<SheetInfo>,
}

impl SpreadsheetMetadata {
    pub fn sheet(&self, name: &str) -> Option<&SheetInfo> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// A spreadsheet addressed by A1 ranges.
///
/// Row indices passed to the delete calls are 0-based; `end_index` is
/// exclusive. Implementations own retries and timeouts.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Identity of the spreadsheet; scopes cached header rows.
    fn store_id(&self) -> &str;

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// One [`ValueRange`] per requested range, in request order.
    async fn batch_get_values(&self, ranges: &[String]) -> Result<Vec<ValueRange>>;

    async fn update_values(
        &self,
        range: &str,
        values: Vec<Vec<Option<String>>>,
        mode: ValueInputMode,
    ) -> Result<()>;

    async fn batch_update_values(&self, updates: Vec<RangeUpdate>, mode: ValueInputMode)
        -> Result<()>;

    async fn clear_values(&self, range: &str) -> Result<()>;

    async fn batch_clear_values(&self, ranges: &[String]) -> Result<()>;

    async fn delete_rows(&self, table: &str, start_index: u32, end_index: u32) -> Result<()>;

    /// Delete several single rows; implementations must apply them from the
    /// highest index down so earlier deletions do not shift later ones.
    async fn batch_delete_rows(&self, table: &str, indices: &[u32]) -> Result<()>;

    async fn spreadsheet_metadata(&self) -> Result<SpreadsheetMetadata>;
}
