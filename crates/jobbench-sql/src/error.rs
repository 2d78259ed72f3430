//! Error types for SQL fragment parsing and construction.

use thiserror::Error;

/// Errors raised while building or dissecting SQL fragments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A SELECT statement has no FROM clause.
    #[error("SELECT statement has no FROM clause: {0}")]
    MissingFrom(String),

    /// The column list between SELECT and FROM is empty.
    #[error("SELECT statement has an empty column list: {0}")]
    EmptyColumnList(String),

    /// One entry of the column list is empty (e.g. `SELECT a,,b`).
    #[error("column {index} is empty in: {query}")]
    EmptyColumn { index: usize, query: String },

    /// The FROM clause does not name a table.
    #[error("FROM clause does not name a table: {0}")]
    MissingTable(String),

    /// Identifier contains characters outside `[A-Za-z0-9_]`.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Row width differs from the extracted column list.
    #[error("row has {actual} values but {expected} columns were requested")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// Schema discovery found no table with the given name.
    #[error("table {0} not found in schema")]
    TableNotFound(String),

    /// A CREATE TABLE statement could not be dissected.
    #[error("cannot read column definitions from: {0}")]
    MalformedSchema(String),
}

/// Result type for SQL fragment operations.
pub type Result<T> = std::result::Result<T, Error>;
