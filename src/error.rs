//! Error types for the trstatement library.

use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting an export into a statement.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred while reading the input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error parsing CSV format.
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error parsing the JSON event log.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid date format.
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount format.
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// Missing required field.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid format name specified.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// No converter handles this file.
    #[error("Unsupported file (expected .csv or .json): {0}")]
    UnsupportedFile(String),

    /// A produced statement line failed its self-check.
    #[error("Invalid statement line {id}: {reason}")]
    InvalidLine { id: String, reason: String },
}
