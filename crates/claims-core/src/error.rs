use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the claims dashboard.
///
/// Shape problems inside individual records are never errors; they resolve to
/// documented defaults in [`crate::models::ClaimRecord`]. The variants below
/// cover the data-source boundary and user-supplied configuration.
#[derive(Error, Debug)]
pub enum ClaimsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The payload is not a sequence of claim records.
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// The expected data file or directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No `.json` / `.jsonl` files were found under the given directory.
    #[error("No data files found in {0}")]
    NoDataFiles(PathBuf),

    /// The data source returned no usable records at all.
    #[error("No claim records returned from data source")]
    NoRecords,

    /// A user-supplied date (filter bound) did not match any known format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the claims crates.
pub type Result<T> = std::result::Result<T, ClaimsError>;
