use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use sheetdb_model::{FieldType, HeaderError, SchemaError};
use sheetdb_store::StoreError;
use thiserror::Error;

/// Every way a table operation can fail.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("no headers found in row {header_row} of table `{table}`")]
    NoHeadersFound { table: String, header_row: u32 },
    #[error("invalid header in column {column} of table `{table}`: header names cannot be empty")]
    InvalidHeader { table: String, column: String },
    #[error("duplicated header `{header}` in table `{table}`")]
    DuplicatedHeader { table: String, header: String },

    #[error("invalid where key `{0}`: no such header")]
    InvalidWhereKey(String),
    #[error("invalid where filter `{0}`")]
    InvalidWhereFilter(String),
    #[error("`select` and `omit` cannot be used together")]
    SelectOmitConflict,
    #[error("invalid data key `{0}`: no such field")]
    InvalidDataKey(String),

    #[error("schema type mismatch for `{header}`: `{value}` is not a valid {expected}")]
    SchemaTypeMismatch {
        header: String,
        value: String,
        expected: FieldType,
    },
    #[error("invalid boolean value `{value}` for `{header}`")]
    InvalidBooleanValue { header: String, value: String },
    #[error("field `{0}` is required and has no default value")]
    FieldRequiredNoDefault(String),
    #[error("field `{0}` is not nullable")]
    NullableViolation(String),
    #[error("field `{0}` cannot be both nullable and required")]
    NullableRequiredConflict(String),
    #[error("field `{0}` is declared more than once in the schema")]
    DuplicateSchemaField(String),

    #[error("error fetching columns of table `{table}`: {source}")]
    FetchingColumns {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error("record not found")]
    RecordNotFound,
    #[error("expected a unique record but {count} records matched")]
    MultipleRecordsFoundForUnique { count: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, OperationError>;

impl OperationError {
    pub(crate) fn from_header(table: &str, header_row: u32, err: HeaderError) -> Self {
        let table = table.to_string();
        match err {
            HeaderError::NoHeadersFound => OperationError::NoHeadersFound { table, header_row },
            HeaderError::InvalidHeader { column } => OperationError::InvalidHeader { table, column },
            HeaderError::DuplicatedHeader(header) => {
                OperationError::DuplicatedHeader { table, header }
            }
        }
    }
}

impl From<SchemaError> for OperationError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::NullableRequiredConflict(key) => OperationError::NullableRequiredConflict(key),
            SchemaError::DuplicateField(key) => OperationError::DuplicateSchemaField(key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// A captured operation result for batch-style callers that report partial
/// success instead of propagating the first error.
///
/// Serializes as `{"status": "success", "data": ...}` or
/// `{"status": "failure", "error": "<message>"}`.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Failure(OperationError),
}

impl<T> Outcome<T> {
    pub fn capture(result: Result<T>) -> Self {
        match result {
            Ok(data) => Outcome::Success(data),
            Err(err) => {
                log::debug!("captured operation failure: {err}");
                Outcome::Failure(err)
            }
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::Success(_) => OutcomeStatus::Success,
            Outcome::Failure(_) => OutcomeStatus::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&OperationError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    /// Human-readable failure message, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    /// Turn a captured outcome back into a `Result` for callers that want to
    /// propagate with `?`.
    pub fn into_result(self) -> Result<T> {
        match self {
            Outcome::Success(data) => Ok(data),
            Outcome::Failure(err) => Err(err),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        Self::capture(result)
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outcome", 2)?;
        state.serialize_field("status", &self.status())?;
        match self {
            Outcome::Success(data) => state.serialize_field("data", data)?,
            Outcome::Failure(err) => state.serialize_field("error", &err.to_string())?,
        }
        state.end()
    }
}
