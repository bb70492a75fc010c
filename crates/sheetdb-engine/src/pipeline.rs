//! The stages shared by every table operation.
//!
//! validate -> resolve headers -> check where keys -> fetch columns ->
//! filter -> fetch rows -> adapt -> project. Operations pick the stages they
//! need and add their own action on the matched rows.

use std::sync::Arc;

use sheetdb_model::{column_range, last_column, row_span_range, HeaderColumn, Record, Schema};
use sheetdb_store::TabularStore;

use crate::adapter::RecordAdapter;
use crate::config::TableOptions;
use crate::error::{OperationError, Result};
use crate::filter::{SingleColumn, WhereClause, WhereEvaluator};
use crate::headers::{resolve_headers, HeaderCache};

/// Everything a pipeline run reads from its table handle.
pub(crate) struct Pipeline<'a, S: ?Sized> {
    pub store: &'a S,
    pub cache: &'a HeaderCache,
    pub table: &'a str,
    pub options: &'a TableOptions,
    pub schema: &'a Schema,
}

/// The rows a where clause selected.
#[derive(Debug)]
pub(crate) struct Selection {
    pub headers: Arc<[HeaderColumn]>,
    /// Zero-based sheet row indices, ascending.
    pub positions: Vec<u32>,
}

impl<'a, S> Pipeline<'a, S>
where
    S: TabularStore + ?Sized,
{
    pub fn adapter<'h>(&'h self, headers: &'h [HeaderColumn]) -> RecordAdapter<'h> {
        RecordAdapter::new(headers, self.schema)
    }

    /// Supplied headers win when non-empty; otherwise resolve through the cache.
    pub async fn headers(&self, supplied: Option<&[HeaderColumn]>) -> Result<Arc<[HeaderColumn]>> {
        match supplied {
            Some(headers) if !headers.is_empty() => Ok(Arc::from(headers)),
            _ => {
                resolve_headers(self.store, self.cache, self.table, self.options.header_row()).await
            }
        }
    }

    /// Fetch the data cells of `columns`, padded to a common length.
    pub async fn fetch_columns(&self, columns: &[&HeaderColumn]) -> Result<Vec<SingleColumn>> {
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let ranges: Vec<String> = columns
            .iter()
            .map(|h| column_range(self.table, h.column_index))
            .collect();
        let fetched = self
            .store
            .batch_get_values(&ranges)
            .await
            .map_err(|source| OperationError::FetchingColumns {
                table: self.table.to_string(),
                source,
            })?;

        let skip = self.options.header_row() as usize;
        let mut out: Vec<SingleColumn> = columns
            .iter()
            .zip(fetched)
            .map(|(header, range)| {
                let values = range
                    .values
                    .into_iter()
                    .skip(skip)
                    .map(|row| row.into_iter().next().unwrap_or_default())
                    .collect();
                SingleColumn::new(header.name.clone(), values)
            })
            .collect();

        // The store trims trailing empty cells, so columns can differ in length.
        let rows = out.iter().map(|c| c.values.len()).max().unwrap_or(0);
        for column in &mut out {
            column.values.resize(rows, String::new());
        }
        log::debug!(
            "fetched {} column(s) of `{}` ({rows} data rows)",
            out.len(),
            self.table
        );
        Ok(out)
    }

    /// Row index right after the last occupied row of any header column.
    pub async fn next_free_row(&self, headers: &[HeaderColumn]) -> Result<u32> {
        let ranges: Vec<String> = headers
            .iter()
            .map(|h| column_range(self.table, h.column_index))
            .collect();
        let fetched = self
            .store
            .batch_get_values(&ranges)
            .await
            .map_err(|source| OperationError::FetchingColumns {
                table: self.table.to_string(),
                source,
            })?;
        let occupied = fetched.iter().map(|r| r.values.len()).max().unwrap_or(0) as u32;
        Ok(occupied.max(self.options.header_row()))
    }

    /// Resolve headers and compute the rows matching `where_clause`.
    ///
    /// The clause is validated before any store request.
    pub async fn select_rows(
        &self,
        where_clause: &WhereClause,
        supplied_headers: Option<&[HeaderColumn]>,
    ) -> Result<Selection> {
        where_clause.validate()?;
        let headers = self.headers(supplied_headers).await?;

        let columns: Vec<&HeaderColumn> = if where_clause.is_empty() {
            headers.iter().collect()
        } else {
            where_clause.check_keys(&headers)?
        };
        let fetched = self.fetch_columns(&columns).await?;
        let positions =
            WhereEvaluator::new(where_clause, &fetched, self.options.header_row())?.matches();
        log::debug!(
            "{} row(s) of `{}` match {} condition(s)",
            positions.len(),
            self.table,
            where_clause.len()
        );
        Ok(Selection { headers, positions })
    }

    /// Fetch the full rows at `positions`, one range per contiguous run.
    pub async fn fetch_rows(
        &self,
        headers: &[HeaderColumn],
        positions: &[u32],
    ) -> Result<Vec<Vec<String>>> {
        let Some(last_col) = last_column(headers) else {
            return Ok(vec![Vec::new(); positions.len()]);
        };
        let spans = coalesce(positions);
        if spans.is_empty() {
            return Ok(Vec::new());
        }
        let ranges: Vec<String> = spans
            .iter()
            .map(|&(first, last)| row_span_range(self.table, first + 1, last + 1, last_col))
            .collect();
        let fetched = self.store.batch_get_values(&ranges).await?;

        let mut rows = Vec::with_capacity(positions.len());
        for (&(first, last), range) in spans.iter().zip(fetched) {
            let expected = (last - first + 1) as usize;
            if range.values.len() > expected {
                log::warn!(
                    "range {} returned {} rows, expected at most {expected}",
                    range.range,
                    range.values.len()
                );
            }
            let mut span_rows = range.values;
            span_rows.resize(expected, Vec::new());
            rows.extend(span_rows);
        }
        log::debug!("fetched {} row(s) of `{}`", rows.len(), self.table);
        Ok(rows)
    }

    /// Fetch and adapt the records at `positions`.
    pub async fn fetch_records(
        &self,
        headers: &[HeaderColumn],
        positions: &[u32],
    ) -> Result<Vec<Record>> {
        let rows = self.fetch_rows(headers, positions).await?;
        let adapter = self.adapter(headers);
        rows.iter().map(|row| adapter.to_record(row)).collect()
    }

    /// Inclusive 1-based row spans covering `positions`, as A1 ranges.
    pub fn span_ranges(&self, headers: &[HeaderColumn], positions: &[u32]) -> Vec<String> {
        let last_col = last_column(headers).unwrap_or(0);
        coalesce(positions)
            .into_iter()
            .map(|(first, last)| row_span_range(self.table, first + 1, last + 1, last_col))
            .collect()
    }
}

/// Merge ascending positions into inclusive `(first, last)` runs.
pub(crate) fn coalesce(positions: &[u32]) -> Vec<(u32, u32)> {
    let mut spans: Vec<(u32, u32)> = Vec::new();
    for &pos in positions {
        match spans.last_mut() {
            Some((_, last)) if last.checked_add(1) == Some(pos) => *last = pos,
            _ => spans.push((pos, pos)),
        }
    }
    spans
}

/// Apply `offset` then `limit` to matched positions.
pub(crate) fn page(positions: Vec<u32>, offset: Option<usize>, limit: Option<usize>) -> Vec<u32> {
    positions
        .into_iter()
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
