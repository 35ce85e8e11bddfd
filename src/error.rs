//! Error types for the lookup library.

use std::path::PathBuf;

/// Top-level error enum for the lookup library.
///
/// A catalog number that matches nothing is not an error; lookups return
/// `Ok(None)` for that.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Invalid JSON in {} at line {line}, column {column}: {message}\n-> File begins with: {snippet}",
        .path.display()
    )]
    Config {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
        snippet: String,
    },

    #[error("Invalid schema {}: {reason}", .path.display())]
    Schema { path: PathBuf, reason: String },

    #[error("Sheet error: {0}")]
    Sheet(String),

    #[error("Catalog number {0:?} cannot be used as a file name")]
    UnsafeFileName(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LookupError>;
