use crate::store::{
    RangeUpdate, Result, SheetInfo, SpreadsheetMetadata, StoreError, TabularStore, ValueInputMode,
    ValueRange,
};
use async_trait::async_trait;
use sheetdb_model::SheetRange;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-call counters, useful for asserting how much I/O an operation needed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub get_calls: u64,
    pub batch_get_calls: u64,
    /// Ranges requested across `get` and `batch_get` calls.
    pub ranges_read: u64,
    pub update_calls: u64,
    pub batch_update_calls: u64,
    pub clear_calls: u64,
    pub delete_calls: u64,
    pub metadata_calls: u64,
}

impl MemoryStoreStats {
    pub fn total_calls(&self) -> u64 {
        self.get_calls
            + self.batch_get_calls
            + self.update_calls
            + self.batch_update_calls
            + self.clear_calls
            + self.delete_calls
            + self.metadata_calls
    }
}

/// Which request kinds fail with [`StoreError::Transport`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FaultConfig {
    pub get: bool,
    pub batch_get: bool,
    pub write: bool,
    pub delete: bool,
}

#[derive(Debug)]
struct SheetData {
    id: u32,
    name: String,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct Inner {
    sheets: Vec<SheetData>,
    next_sheet_id: u32,
    stats: MemoryStoreStats,
    faults: FaultConfig,
}

impl Inner {
    fn sheet(&self, name: &str) -> Result<&SheetData> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut SheetData> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_string()))
    }
}

/// An in-process spreadsheet implementing [`TabularStore`].
///
/// Cells are plain strings. Reads follow the remote API conventions: trailing
/// empty cells and trailing empty rows are not returned.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    id: Arc<str>,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Arc::from(id.into()),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Create (or replace the contents of) a sheet. Returns the sheet id.
    pub fn add_sheet<R, C, S>(&self, name: &str, rows: R) -> u32
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();

        let mut inner = self.lock();
        if let Ok(sheet) = inner.sheet_mut(name) {
            sheet.rows = rows;
            return sheet.id;
        }
        let id = inner.next_sheet_id;
        inner.next_sheet_id += 1;
        inner.sheets.push(SheetData {
            id,
            name: name.to_string(),
            rows,
        });
        id
    }

    /// Snapshot of a sheet's occupied cells, trimmed like a read of the whole sheet.
    pub fn sheet_values(&self, name: &str) -> Option<Vec<Vec<String>>> {
        let inner = self.lock();
        let sheet = inner.sheet(name).ok()?;
        let mut rows: Vec<Vec<String>> = sheet
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                trim_trailing_empty(&mut row);
                row
            })
            .collect();
        while rows.last().is_some_and(Vec::is_empty) {
            rows.pop();
        }
        Some(rows)
    }

    pub fn stats(&self) -> MemoryStoreStats {
        self.lock().stats
    }

    pub fn reset_stats(&self) {
        self.lock().stats = MemoryStoreStats::default();
    }

    pub fn set_faults(&self, faults: FaultConfig) {
        self.lock().faults = faults;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every mutation completes before the guard drops, so a poisoned
        // lock still guards consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_range(range: &str) -> Result<(String, SheetRange)> {
    let parsed = SheetRange::parse(range).map_err(|source| StoreError::InvalidRange {
        range: range.to_string(),
        source,
    })?;
    let sheet = parsed
        .sheet
        .clone()
        .ok_or_else(|| StoreError::MissingSheet(range.to_string()))?;
    Ok((sheet, parsed))
}

fn injected(kind: &str) -> StoreError {
    StoreError::Transport(format!("injected {kind} failure"))
}

fn trim_trailing_empty(row: &mut Vec<String>) {
    while row.last().is_some_and(String::is_empty) {
        row.pop();
    }
}

fn read_range(sheet: &SheetData, range: &SheetRange) -> Vec<Vec<String>> {
    let height = sheet.rows.len() as u32;
    let width = sheet.rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
    if height == 0 || width == 0 {
        return Vec::new();
    }

    let first_row = range.first_row();
    let last_row = range.last_row().unwrap_or(height - 1).min(height - 1);
    let first_col = range.first_col();
    let last_col = range.last_col().unwrap_or(width - 1).min(width - 1);
    if first_row > last_row || first_col > last_col {
        return Vec::new();
    }

    let mut out: Vec<Vec<String>> = (first_row..=last_row)
        .map(|r| {
            let cells = &sheet.rows[r as usize];
            let mut row: Vec<String> = (first_col..=last_col)
                .map(|c| cells.get(c as usize).cloned().unwrap_or_default())
                .collect();
            trim_trailing_empty(&mut row);
            row
        })
        .collect();
    while out.last().is_some_and(Vec::is_empty) {
        out.pop();
    }
    out
}

fn write_range(sheet: &mut SheetData, range: &SheetRange, values: Vec<Vec<Option<String>>>) {
    let first_row = range.first_row() as usize;
    let first_col = range.first_col() as usize;
    for (i, row_values) in values.into_iter().enumerate() {
        let r = first_row + i;
        if sheet.rows.len() <= r {
            sheet.rows.resize_with(r + 1, Vec::new);
        }
        let row = &mut sheet.rows[r];
        for (j, cell) in row_values.into_iter().enumerate() {
            let Some(cell) = cell else {
                continue;
            };
            let c = first_col + j;
            if row.len() <= c {
                row.resize(c + 1, String::new());
            }
            row[c] = cell;
        }
    }
}

fn clear_range(sheet: &mut SheetData, range: &SheetRange) {
    let first_row = range.first_row() as usize;
    let first_col = range.first_col() as usize;
    let last_row = range.last_row().map_or(usize::MAX, |r| r as usize);
    let last_col = range.last_col().map_or(usize::MAX, |c| c as usize);
    for row in sheet
        .rows
        .iter_mut()
        .enumerate()
        .filter(|(r, _)| *r >= first_row && *r <= last_row)
        .map(|(_, row)| row)
    {
        for cell in row
            .iter_mut()
            .enumerate()
            .filter(|(c, _)| *c >= first_col && *c <= last_col)
            .map(|(_, cell)| cell)
        {
            cell.clear();
        }
        trim_trailing_empty(row);
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    fn store_id(&self) -> &str {
        &self.id
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let mut inner = self.lock();
        inner.stats.get_calls += 1;
        inner.stats.ranges_read += 1;
        if inner.faults.get {
            return Err(injected("get"));
        }
        let (sheet, parsed) = parse_range(range)?;
        log::trace!("memory store read {range}");
        Ok(read_range(inner.sheet(&sheet)?, &parsed))
    }

    async fn batch_get_values(&self, ranges: &[String]) -> Result<Vec<ValueRange>> {
        let mut inner = self.lock();
        inner.stats.batch_get_calls += 1;
        inner.stats.ranges_read += ranges.len() as u64;
        if inner.faults.batch_get {
            return Err(injected("batch get"));
        }
        let mut out = Vec::with_capacity(ranges.len());
        for range in ranges {
            let (sheet, parsed) = parse_range(range)?;
            out.push(ValueRange {
                range: range.clone(),
                values: read_range(inner.sheet(&sheet)?, &parsed),
            });
        }
        Ok(out)
    }

    async fn update_values(
        &self,
        range: &str,
        values: Vec<Vec<Option<String>>>,
        _mode: ValueInputMode,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.stats.update_calls += 1;
        if inner.faults.write {
            return Err(injected("write"));
        }
        let (sheet, parsed) = parse_range(range)?;
        write_range(inner.sheet_mut(&sheet)?, &parsed, values);
        Ok(())
    }

    async fn batch_update_values(
        &self,
        updates: Vec<RangeUpdate>,
        _mode: ValueInputMode,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.stats.batch_update_calls += 1;
        if inner.faults.write {
            return Err(injected("write"));
        }
        // Validate every range before touching any cell.
        let mut parsed = Vec::with_capacity(updates.len());
        for update in &updates {
            let (sheet, range) = parse_range(&update.range)?;
            inner.sheet(&sheet)?;
            parsed.push((sheet, range));
        }
        for ((sheet, range), update) in parsed.into_iter().zip(updates) {
            write_range(inner.sheet_mut(&sheet)?, &range, update.values);
        }
        Ok(())
    }

    async fn clear_values(&self, range: &str) -> Result<()> {
        self.batch_clear_values(&[range.to_string()]).await
    }

    async fn batch_clear_values(&self, ranges: &[String]) -> Result<()> {
        let mut inner = self.lock();
        inner.stats.clear_calls += 1;
        if inner.faults.write {
            return Err(injected("clear"));
        }
        let mut parsed = Vec::with_capacity(ranges.len());
        for range in ranges {
            let (sheet, range) = parse_range(range)?;
            inner.sheet(&sheet)?;
            parsed.push((sheet, range));
        }
        for (sheet, range) in parsed {
            clear_range(inner.sheet_mut(&sheet)?, &range);
        }
        Ok(())
    }

    async fn delete_rows(&self, table: &str, start_index: u32, end_index: u32) -> Result<()> {
        let mut inner = self.lock();
        inner.stats.delete_calls += 1;
        if inner.faults.delete {
            return Err(injected("delete"));
        }
        let sheet = inner.sheet_mut(table)?;
        let len = sheet.rows.len();
        if start_index as usize >= len {
            return Err(StoreError::RowOutOfBounds {
                sheet: table.to_string(),
                index: start_index,
            });
        }
        let end = (end_index as usize).min(len);
        if end > start_index as usize {
            sheet.rows.drain(start_index as usize..end);
        }
        Ok(())
    }

    async fn batch_delete_rows(&self, table: &str, indices: &[u32]) -> Result<()> {
        let mut inner = self.lock();
        inner.stats.delete_calls += 1;
        if inner.faults.delete {
            return Err(injected("delete"));
        }
        let sheet = inner.sheet_mut(table)?;

        let mut indices = indices.to_vec();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        if let Some(&highest) = indices.first() {
            if highest as usize >= sheet.rows.len() {
                return Err(StoreError::RowOutOfBounds {
                    sheet: table.to_string(),
                    index: highest,
                });
            }
        }
        for index in indices {
            sheet.rows.remove(index as usize);
        }
        log::debug!("memory store deleted rows from `{table}`");
        Ok(())
    }

    async fn spreadsheet_metadata(&self) -> Result<SpreadsheetMetadata> {
        let mut inner = self.lock();
        inner.stats.metadata_calls += 1;
        Ok(SpreadsheetMetadata {
            sheets: inner
                .sheets
                .iter()
                .map(|s| SheetInfo {
                    name: s.name.clone(),
                    id: s.id,
                })
                .collect(),
        })
    }
}
