//! SQL fragments for the jobbench SQL overlay backend.
//!
//! The overlay runs SQLite behind a key-value server's custom-command
//! channel. Its replies are bare row tuples with no column metadata, so the
//! caller has to recover column names from the statement it sent.
//!
//! # Usage
//!
//! ```rust
//! use jobbench_sql::{extract_columns, ColumnList};
//!
//! let columns = extract_columns("SELECT a, b as c FROM t").unwrap();
//! assert_eq!(columns, Some(ColumnList::Named(vec!["a".into(), "c".into()])));
//!
//! let wildcard = extract_columns("SELECT * FROM t").unwrap();
//! assert_eq!(wildcard, Some(ColumnList::Wildcard));
//! ```

pub mod builder;
pub mod columns;
pub mod command;
pub mod error;

pub use builder::{create_id_index, create_table, insert_job, quote_text, select_job, validate_identifier};
pub use columns::{
    columns_from_schema, extract_columns, source_table, Cell, ColumnList, Row,
    SCHEMA_DISCOVERY_QUERY,
};
pub use command::{OverlayCommand, DEFAULT_COMMAND_PREFIX};
pub use error::{Error, Result};
