//! Utility functions for error handling
//!
//! File helpers that attach the path and the reason the file was needed to
//! any IO failure.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Result, StopAnalysisError};

/// Open a file for reading with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(StopAnalysisError::file(
            path,
            format!("file not found (needed for: {purpose})"),
        ));
    }

    if !path.is_file() {
        return Err(StopAnalysisError::file(
            path,
            format!("path is not a file (expected a file for: {purpose})"),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let message = match e.kind() {
            io::ErrorKind::PermissionDenied => "permission denied - check file permissions".to_string(),
            _ => format!("failed to open file for: {purpose}"),
        };
        StopAnalysisError::file_with_source(path, message, e)
    })
}

/// Create (or truncate) a file for writing, creating parent directories
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent, purpose)?;
        }
    }

    fs::File::create(path).map_err(|e| {
        StopAnalysisError::file_with_source(path, format!("failed to create file for: {purpose}"), e)
    })
}

/// Make sure a directory exists, creating it if needed
pub fn ensure_directory(path: &Path, purpose: &str) -> Result<()> {
    if path.exists() && !path.is_dir() {
        return Err(StopAnalysisError::file(
            path,
            format!("path is not a directory (expected a directory for: {purpose})"),
        ));
    }

    fs::create_dir_all(path).map_err(|e| {
        StopAnalysisError::file_with_source(
            path,
            format!("failed to create directory for: {purpose}"),
            e,
        )
    })
}
