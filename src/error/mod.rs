//! Error handling for cohort derivation and scoring.
//!
//! Two kinds of problems exist. Fatal problems (bad configuration, unreadable
//! tables) are returned as [`Error`]. Record-level problems never abort a
//! batch; they are collected in a [`QualityReport`] so they can be counted.

pub mod quality;

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

pub use quality::{DataQualityIssue, IssueKind, QualityReport, RecordIssue};

/// Specialized error type for cohort and scoring operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or inconsistent configuration, detected before any computation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error building or reading Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error reading a JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error converting between records and Arrow batches
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A required table file was not found
    #[error("Table '{table}' not found at {path}")]
    MissingTable {
        /// Table name
        table: String,
        /// Path that was searched
        path: String,
    },
}

impl Error {
    /// Create a configuration error from any message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<serde_arrow::Error> for Error {
    fn from(error: serde_arrow::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Result type for cohort and scoring operations
pub type Result<T> = std::result::Result<T, Error>;
