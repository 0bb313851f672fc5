//! Error types for the data-loader crate.
//!
//! Every store operation and every parser returns [`Result`], so callers
//! can tell a malformed data file apart from a store that is temporarily
//! unreachable.

use thiserror::Error;

/// Errors that can occur while loading data or querying a store
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Expected number of fields in a line doesn't match actual
    #[error("Expected {expected} fields but found {found} in line {line}")]
    FieldCountMismatch {
        expected: usize,
        found: usize,
        line: usize,
    },

    /// Referenced entity doesn't exist (e.g., rating for non-existent item)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: u64 },

    /// A store query failed; retrying later may succeed
    #[error("{store} unavailable: {reason}")]
    Unavailable { store: String, reason: String },
}

impl DataLoadError {
    /// Shorthand for a transient store failure
    pub fn unavailable(store: impl Into<String>, reason: impl Into<String>) -> Self {
        DataLoadError::Unavailable {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that a later retry could plausibly get past
    pub fn is_transient(&self) -> bool {
        matches!(self, DataLoadError::Unavailable { .. } | DataLoadError::IoError(_))
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
