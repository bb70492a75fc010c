//! Query and mapping engine for tables stored in a spreadsheet.
//!
//! A [`Table`] turns a `where` clause, a `select`/`omit` projection and an
//! optional [`Schema`](sheetdb_model::Schema) into the smallest set of range
//! reads against a [`TabularStore`](sheetdb_store::TabularStore), then maps
//! the matching rows to typed [`Record`](sheetdb_model::Record)s. Writes go
//! the other way through the same schema rules.
//!
//! ```no_run
//! # async fn demo() -> sheetdb_engine::Result<()> {
//! use sheetdb_engine::{Finder, FindOptions, Filter, SheetDb, WhereClause};
//! use sheetdb_store::MemoryStore;
//!
//! let db = SheetDb::new(MemoryStore::new("book"));
//! let users = db.table("Users");
//! let adults = users
//!     .find_many(
//!         FindOptions::new()
//!             .filter(WhereClause::new().field("age", Filter::op("gte", 18)))
//!             .select(["name"]),
//!     )
//!     .await?;
//! # drop(adults);
//! # Ok(())
//! # }
//! ```

mod adapter;
mod coerce;
mod config;
mod error;
mod filter;
mod headers;
mod ops;
mod pipeline;
mod predicate;
mod projection;
mod table;

pub use adapter::{resolve_write_value, RecordAdapter};
pub use coerce::{coerce, parse_bool, parse_date, to_cell, CoercionError, CoercionResult};
pub use config::TableOptions;
pub use error::{OperationError, Outcome, OutcomeStatus, Result};
pub use filter::{Filter, SingleColumn, WhereClause, WhereEvaluator};
pub use headers::{resolve_headers, HeaderCache, HeaderCacheStats};
pub use ops::{
    ClearOptions, Clearer, DeleteOptions, Deleter, FindOptions, Finder, InsertOptions, Inserter,
    RemoveOptions, UpdateOptions, Updater,
};
pub use predicate::{Condition, Operand, Predicate, PredicateError};
pub use projection::Projection;
pub use table::{SheetDb, Table};
