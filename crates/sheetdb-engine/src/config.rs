use serde::{Deserialize, Serialize};
use sheetdb_store::ValueInputMode;

/// Per-table settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// 1-based row holding the header names (default: 1).
    pub header_row: u32,
    /// How written cells are interpreted by the store (default: user-entered).
    pub value_input_mode: ValueInputMode,
    /// Return a snapshot of the affected records from clear/delete (default: false).
    pub return_records: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            header_row: 1,
            value_input_mode: ValueInputMode::default(),
            return_records: false,
        }
    }
}

impl TableOptions {
    /// The header row, clamped to the first row of the sheet.
    pub fn header_row(&self) -> u32 {
        self.header_row.max(1)
    }
}
