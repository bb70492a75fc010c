//! `sheetdb-model` defines the value objects shared by the sheetdb crates.
//!
//! The crate is intentionally free of I/O so it can be reused by:
//! - the query engine (headers, schemas, records)
//! - store implementations (A1 range building and parsing)
//! - application code that persists schemas as JSON via `serde`

mod address;
mod header;
mod record;
mod schema;
mod value;

pub use address::{
    cell_range, column_index, column_letter, column_range, quote_table_name, row_range,
    row_span_range, whole_row_range, A1ParseError, RangeBound, RangeParseError, SheetRange,
    MAX_COLUMNS,
};
pub use header::{build_header_columns, find_header, last_column, HeaderColumn, HeaderError};
pub use record::{Record, RecordError};
pub use schema::{FieldType, Schema, SchemaError, SchemaField};
pub use value::{format_date, format_number, parse_float, FieldValue};
