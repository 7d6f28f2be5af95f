//! Error handling for the stop-analysis pipeline.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for the cleaning and modeling stages
#[derive(Debug, thiserror::Error)]
pub enum StopAnalysisError {
    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File-level IO error with the offending path and purpose
    #[error("IO error on {path}: {message}")]
    File {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error converting between row structs and record batches
    #[error("Row conversion error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    /// Error reading or writing JSON configuration and reports
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected column missing, or column sets that cannot be aligned
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Categorical values outside the allow-list, one entry per column
    #[error("Unexpected categorical values: {}", .0.join("; "))]
    UnexpectedValues(Vec<String>),

    /// A field that could not be coerced to its typed form
    #[error("Parse error in column {column} at row {row}: {message}")]
    Parse {
        column: String,
        row: usize,
        message: String,
    },

    /// A requested target column is not part of the frame
    #[error("Target column not found: {0}")]
    MissingTarget(String),

    /// A classifier was given a feature matrix it cannot be applied to
    #[error("{model} requires feature column '{column}', which is absent")]
    IncompatibleFeatures { model: String, column: String },

    /// Configuration values that cannot work together
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Numerical failure inside a model (empty data, single class, ...)
    #[error("Model error: {0}")]
    Model(String),
}

impl StopAnalysisError {
    /// Build a file error without an underlying IO source
    pub fn file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Build a file error wrapping the IO error that caused it
    pub fn file_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: io::Error,
    ) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Shorthand for a model error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }
}

/// Result type for stop-analysis operations
pub type Result<T> = std::result::Result<T, StopAnalysisError>;
