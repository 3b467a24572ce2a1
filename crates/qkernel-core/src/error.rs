use thiserror::Error;

use crate::schema::ValueType;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    /// The column exists but its declared type is not the native type requested.
    #[error("impossible cast on column '{column}': declared {actual}, requested {expected}")]
    TypeMismatch {
        column: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("unsupported type {0}")]
    UnsupportedType(ValueType),

    #[error("row index {index} out of range (row count {row_count})")]
    RowOutOfRange { index: usize, row_count: usize },

    #[error("stale row handle: generation {row} does not match table generation {table}")]
    StaleRow { row: u64, table: u64 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}
