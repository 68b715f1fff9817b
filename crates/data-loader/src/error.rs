//! Error types for the data-loader crate.
//!
//! Loading is all-or-nothing: the first bad row aborts the whole file so a
//! caller never sees a partially ingested split.

use thiserror::Error;

/// Errors that can occur while loading ratings or the movie catalog
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A row couldn't be parsed into the expected numeric fields
    ///
    /// Carries the file and 1-based line number so the offending row can be found
    #[error("Malformed record at line {line} in {file}: {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },

    /// A field parsed but holds a value we can't accept, e.g. a NaN label
    #[error("Invalid {field} '{value}' at line {line} in {file}")]
    InvalidValue {
        file: String,
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
