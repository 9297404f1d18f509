//! Typed failures raised while loading and coercing result tables.
//!
//! Every variant is fatal: the run aborts on the first one.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the scanner, loader and merge stages.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed results file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Non-numeric task_id {value:?} in {path} (record {line})")]
    InvalidTaskId {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("Unparseable timestamp {value:?} in {path} (record {line})")]
    InvalidTimestamp {
        path: PathBuf,
        line: usize,
        value: String,
    },
}

impl AuditError {
    /// Whether this error came from parsing or coercing table contents.
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, AuditError::Io { .. })
    }
}

/// Result type for table-level operations.
pub type AuditResult<T> = std::result::Result<T, AuditError>;
