//! The tabular store boundary for sheetdb.
//!
//! The query engine only ever talks to a spreadsheet through [`TabularStore`]:
//! range reads (single and batched), range writes, clears, row deletion and
//! sheet metadata. This crate also ships [`MemoryStore`], an in-process
//! implementation used by tests and by embeddings that keep tables in memory.

mod memory;
mod store;

pub use memory::{FaultConfig, MemoryStore, MemoryStoreStats};
pub use store::{
    RangeUpdate, Result, SheetInfo, SpreadsheetMetadata, StoreError, TabularStore, ValueInputMode,
    ValueRange,
};
