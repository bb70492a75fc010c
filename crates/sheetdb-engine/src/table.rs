use std::sync::Arc;

use async_trait::async_trait;
use sheetdb_model::{cell_range, row_span_range, HeaderColumn, Record, Schema};
use sheetdb_store::{RangeUpdate, TabularStore};

use crate::config::TableOptions;
use crate::error::{OperationError, Result};
use crate::filter::WhereClause;
use crate::headers::HeaderCache;
use crate::ops::{
    ClearOptions, Clearer, DeleteOptions, Deleter, FindOptions, Finder, InsertOptions, Inserter,
    UpdateOptions, Updater,
};
use crate::pipeline::{page, Pipeline};

/// A spreadsheet store plus the header cache shared by its tables.
#[derive(Debug)]
pub struct SheetDb<S: ?Sized> {
    store: Arc<S>,
    cache: HeaderCache,
}

impl<S: ?Sized> Clone for SheetDb<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
        }
    }
}

impl<S: TabularStore> SheetDb<S> {
    pub fn new(store: S) -> Self {
        Self::with_cache(Arc::new(store), HeaderCache::new())
    }
}

impl<S: TabularStore + ?Sized> SheetDb<S> {
    /// Share a cache across several stores (entries are keyed by store id).
    pub fn with_cache(store: Arc<S>, cache: HeaderCache) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &HeaderCache {
        &self.cache
    }

    /// A handle bound to one sheet, with default options and no schema.
    pub fn table(&self, name: impl Into<String>) -> Table<S> {
        Table {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
            name: name.into(),
            options: TableOptions::default(),
            schema: Schema::default(),
        }
    }

    /// Names of the sheets in the spreadsheet, in store order.
    pub async fn table_names(&self) -> Result<Vec<String>> {
        let metadata = self.store.spreadsheet_metadata().await?;
        Ok(metadata.sheets.into_iter().map(|s| s.name).collect())
    }
}

/// One sheet of a store, queried as a table of records.
#[derive(Debug)]
pub struct Table<S: ?Sized> {
    store: Arc<S>,
    cache: HeaderCache,
    name: String,
    options: TableOptions,
    schema: Schema,
}

impl<S: ?Sized> Clone for Table<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
            name: self.name.clone(),
            options: self.options.clone(),
            schema: self.schema.clone(),
        }
    }
}

impl<S: TabularStore + ?Sized> Table<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a schema. Fails if a field is both nullable and required.
    pub fn with_schema(mut self, schema: Schema) -> Result<Self> {
        schema.validate()?;
        self.schema = schema;
        Ok(self)
    }

    /// The validated header row, from the cache when available.
    pub async fn headers(&self) -> Result<Arc<[HeaderColumn]>> {
        self.pipeline().headers(None).await
    }

    /// Forget the cached header row so the next operation reads it again.
    pub fn invalidate_headers(&self) -> bool {
        self.cache.invalidate(self.store.store_id(), &self.name)
    }

    fn pipeline(&self) -> Pipeline<'_, S> {
        Pipeline {
            store: &self.store,
            cache: &self.cache,
            table: &self.name,
            options: &self.options,
            schema: &self.schema,
        }
    }

    fn empty_snapshot(&self) -> Option<Vec<Record>> {
        self.options.return_records.then(Vec::new)
    }
}

#[async_trait]
impl<S: TabularStore + ?Sized> Finder for Table<S> {
    async fn find_many(&self, options: FindOptions) -> Result<Vec<Record>> {
        let projection = options.projection();
        projection.validate()?;

        let pipeline = self.pipeline();
        let selection = pipeline
            .select_rows(&options.where_clause, Some(options.headers.as_slice()))
            .await?;
        let positions = page(selection.positions, options.offset, options.limit);
        if positions.is_empty() {
            return Ok(Vec::new());
        }
        let records = pipeline.fetch_records(&selection.headers, &positions).await?;
        projection.apply(records, &self.schema)
    }

    async fn find_unique(&self, options: FindOptions) -> Result<Option<Record>> {
        let projection = options.projection();
        projection.validate()?;

        let pipeline = self.pipeline();
        let selection = pipeline
            .select_rows(&options.where_clause, Some(options.headers.as_slice()))
            .await?;
        match selection.positions.len() {
            0 => Ok(None),
            1 => {
                let records = pipeline
                    .fetch_records(&selection.headers, &selection.positions)
                    .await?;
                Ok(projection.apply(records, &self.schema)?.into_iter().next())
            }
            count => Err(OperationError::MultipleRecordsFoundForUnique { count }),
        }
    }

    async fn count(&self, where_clause: WhereClause) -> Result<usize> {
        let selection = self.pipeline().select_rows(&where_clause, None).await?;
        Ok(selection.positions.len())
    }
}

#[async_trait]
impl<S: TabularStore + ?Sized> Inserter for Table<S> {
    async fn insert(&self, options: InsertOptions) -> Result<Vec<Record>> {
        let projection = options.projection();
        projection.validate()?;
        if options.data.is_empty() {
            return Ok(Vec::new());
        }

        let pipeline = self.pipeline();
        let headers = pipeline.headers(None).await?;
        let adapter = pipeline.adapter(&headers);
        let rows = options
            .data
            .iter()
            .map(|record| adapter.from_record(record))
            .collect::<Result<Vec<_>>>()?;

        // Every row must read back before anything is written.
        let written = rows
            .iter()
            .map(|row| adapter.to_written_record(row))
            .collect::<Result<Vec<_>>>()?;

        let start = pipeline.next_free_row(&headers).await?;
        let end = start + rows.len() as u32 - 1;
        let last_col = adapter.width().saturating_sub(1) as u32;
        let range = row_span_range(&self.name, start + 1, end + 1, last_col);
        let count = rows.len();
        self.store
            .update_values(&range, rows, self.options.value_input_mode)
            .await?;
        log::debug!("inserted {count} row(s) into `{}` at {range}", self.name);

        projection.apply(written, &self.schema)
    }
}

#[async_trait]
impl<S: TabularStore + ?Sized> Updater for Table<S> {
    async fn update(&self, options: UpdateOptions) -> Result<Vec<Record>> {
        let projection = options.projection();
        projection.validate()?;
        options.where_clause.validate()?;

        let pipeline = self.pipeline();
        let headers = pipeline.headers(None).await?;
        let adapter = pipeline.adapter(&headers);
        let mut patch = Vec::with_capacity(options.data.len());
        for (key, value) in options.data.iter() {
            let header = adapter
                .header_for_key(key)
                .ok_or_else(|| OperationError::InvalidDataKey(key.to_string()))?;
            let cell = adapter.write_cell(header, Some(value))?.unwrap_or_default();
            patch.push((header.column_index, cell));
        }

        let selection = pipeline
            .select_rows(&options.where_clause, Some(&headers[..]))
            .await?;
        if selection.positions.is_empty() || patch.is_empty() {
            return Ok(Vec::new());
        }
        let mut rows = pipeline.fetch_rows(&headers, &selection.positions).await?;

        let mut updates = Vec::with_capacity(selection.positions.len() * patch.len());
        for (&pos, row) in selection.positions.iter().zip(rows.iter_mut()) {
            for (col, cell) in &patch {
                updates.push(RangeUpdate::new(
                    cell_range(&self.name, *col, pos + 1),
                    vec![vec![Some(cell.clone())]],
                ));
                let idx = *col as usize;
                if row.len() <= idx {
                    row.resize(idx + 1, String::new());
                }
                row[idx] = cell.clone();
            }
        }
        let records = rows
            .iter()
            .map(|row| adapter.to_record(row))
            .collect::<Result<Vec<_>>>()?;

        self.store
            .batch_update_values(updates, self.options.value_input_mode)
            .await?;
        log::debug!(
            "updated {} field(s) on {} row(s) of `{}`",
            patch.len(),
            records.len(),
            self.name
        );

        projection.apply(records, &self.schema)
    }
}

#[async_trait]
impl<S: TabularStore + ?Sized> Clearer for Table<S> {
    async fn clear(&self, options: ClearOptions) -> Result<Option<Vec<Record>>> {
        let projection = options.projection();
        projection.validate()?;

        let pipeline = self.pipeline();
        let selection = pipeline.select_rows(&options.where_clause, None).await?;
        if selection.positions.is_empty() {
            return Ok(self.empty_snapshot());
        }

        let snapshot = if self.options.return_records {
            Some(
                pipeline
                    .fetch_records(&selection.headers, &selection.positions)
                    .await?,
            )
        } else {
            None
        };
        let ranges = pipeline.span_ranges(&selection.headers, &selection.positions);
        self.store.batch_clear_values(&ranges).await?;
        log::debug!(
            "cleared {} row(s) of `{}` in {} range(s)",
            selection.positions.len(),
            self.name,
            ranges.len()
        );

        snapshot
            .map(|records| projection.apply(records, &self.schema))
            .transpose()
    }
}

#[async_trait]
impl<S: TabularStore + ?Sized> Deleter for Table<S> {
    async fn delete(&self, options: DeleteOptions) -> Result<Option<Vec<Record>>> {
        let projection = options.projection();
        projection.validate()?;

        let pipeline = self.pipeline();
        let selection = pipeline.select_rows(&options.where_clause, None).await?;
        if selection.positions.is_empty() {
            return Ok(self.empty_snapshot());
        }

        let snapshot = if self.options.return_records {
            Some(
                pipeline
                    .fetch_records(&selection.headers, &selection.positions)
                    .await?,
            )
        } else {
            None
        };
        self.store
            .batch_delete_rows(&self.name, &selection.positions)
            .await?;
        log::debug!(
            "deleted {} row(s) of `{}`",
            selection.positions.len(),
            self.name
        );

        snapshot
            .map(|records| projection.apply(records, &self.schema))
            .transpose()
    }
}
