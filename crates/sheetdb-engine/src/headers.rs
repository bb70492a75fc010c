use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sheetdb_model::{build_header_columns, whole_row_range, HeaderColumn};
use sheetdb_store::TabularStore;

use crate::error::{OperationError, Result};

type CacheKey = (String, String);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeaderCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, Arc<[HeaderColumn]>>,
    stats: HeaderCacheStats,
}

/// Validated header rows keyed by `(store id, table)`.
///
/// Clones share the same map. Entries live until they are invalidated; the
/// header row of a table is assumed not to change underneath the cache.
#[derive(Debug, Clone, Default)]
pub struct HeaderCache {
    inner: Arc<Mutex<Inner>>,
}

impl HeaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, store_id: &str, table: &str) -> Option<Arc<[HeaderColumn]>> {
        let mut inner = self.lock();
        let hit = inner
            .entries
            .get(&(store_id.to_string(), table.to_string()))
            .cloned();
        if hit.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        hit
    }

    pub fn insert(&self, store_id: &str, table: &str, headers: Arc<[HeaderColumn]>) {
        self.lock()
            .entries
            .insert((store_id.to_string(), table.to_string()), headers);
    }

    /// Drop the entry for one table. Returns whether an entry existed.
    pub fn invalidate(&self, store_id: &str, table: &str) -> bool {
        let mut inner = self.lock();
        let removed = inner
            .entries
            .remove(&(store_id.to_string(), table.to_string()))
            .is_some();
        if removed {
            inner.stats.invalidations += 1;
        }
        removed
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        let dropped = inner.entries.len() as u64;
        inner.entries.clear();
        inner.stats.invalidations += dropped;
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> HeaderCacheStats {
        self.lock().stats
    }
}

/// Fetch, validate and cache the header row of `table`.
///
/// `header_row` is 1-based. A cached entry is returned without touching the
/// store.
pub async fn resolve_headers<S>(
    store: &S,
    cache: &HeaderCache,
    table: &str,
    header_row: u32,
) -> Result<Arc<[HeaderColumn]>>
where
    S: TabularStore + ?Sized,
{
    let store_id = store.store_id();
    if let Some(headers) = cache.get(store_id, table) {
        log::trace!("header cache hit for {store_id}:{table}");
        return Ok(headers);
    }

    let rows = store.get_values(&whole_row_range(table, header_row)).await?;
    let cells = rows.into_iter().next().unwrap_or_default();
    let headers: Arc<[HeaderColumn]> = build_header_columns(&cells)
        .map_err(|err| OperationError::from_header(table, header_row, err))?
        .into();

    log::debug!(
        "resolved {} headers for table `{table}` from row {header_row}",
        headers.len()
    );
    cache.insert(store_id, table, Arc::clone(&headers));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Arc<[HeaderColumn]> {
        names
            .iter()
            .enumerate()
            .map(|(idx, name)| HeaderColumn::new(*name, idx as u32))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn entries_are_scoped_by_store_and_table() {
        let cache = HeaderCache::new();
        cache.insert("book-1", "Users", columns(&["id", "name"]));
        cache.insert("book-2", "Users", columns(&["id"]));

        assert_eq!(cache.get("book-1", "Users").map(|h| h.len()), Some(2));
        assert_eq!(cache.get("book-2", "Users").map(|h| h.len()), Some(1));
        assert!(cache.get("book-1", "Orders").is_none());

        let shared = cache.clone();
        assert!(shared.invalidate("book-1", "Users"));
        assert!(!shared.invalidate("book-1", "Users"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(
            cache.stats(),
            HeaderCacheStats {
                hits: 2,
                misses: 1,
                invalidations: 2,
            }
        );
    }
}
