//! Benchmark error types.

use thiserror::Error;

use crate::selection::BackendKind;

/// Benchmark errors.
///
/// `Configuration` is fatal and stops the run before any phase starts.
/// `Connection` takes one backend out of the run. `Write`, `Read` and
/// `NotFound` describe a single operation and are tallied, not propagated.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing template, name list or setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Backend unreachable or its setup failed.
    #[error("connection error ({backend}): {message}")]
    Connection {
        backend: BackendKind,
        message: String,
    },

    /// A single write failed or exceeded its deadline.
    #[error("write error: {0}")]
    Write(String),

    /// A single read failed or exceeded its deadline.
    #[error("read error: {0}")]
    Read(String),

    /// Lookup of a key that holds no record.
    #[error("record not found: {0}")]
    NotFound(String),

    /// SQL fragment could not be dissected.
    #[error("malformed query: {0}")]
    MalformedQuery(#[from] jobbench_sql::Error),

    /// IO error while loading input files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn connection(backend: BackendKind, err: impl std::fmt::Display) -> Self {
        Error::Connection {
            backend,
            message: err.to_string(),
        }
    }

    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        Error::Write(err.to_string())
    }

    pub(crate) fn read(err: impl std::fmt::Display) -> Self {
        Error::Read(err.to_string())
    }

    /// Check if this error is a lookup miss rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this error should abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::Io(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Configuration(format!("invalid JSON: {}", err))
    }
}

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, Error>;
