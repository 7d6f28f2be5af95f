//! Flat-file IO for record batches
//!
//! CSV is read with every column as nullable text so validation sees the raw
//! values; callers adapt the batch to a typed schema afterwards. Parquet keeps
//! its stored types.

pub mod csv;
pub mod parquet;

use std::path::Path;

use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use crate::config::ExportFormat;
use crate::error::Result;

/// Default batch size for CSV reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Batch size override from the environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("STOP_ANALYSIS_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Batch size to read with
#[must_use]
pub fn batch_size() -> usize {
    get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE)
}

/// Format implied by a path's extension, CSV when unknown
#[must_use]
pub fn format_for_path(path: &Path) -> ExportFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("parquet") => ExportFormat::Parquet,
        _ => ExportFormat::Csv,
    }
}

/// Read a flat file into a single batch, dispatching on its extension
pub fn read_table(path: &Path, purpose: &str) -> Result<RecordBatch> {
    match format_for_path(path) {
        ExportFormat::Csv => self::csv::read_csv_as_text(path, purpose),
        ExportFormat::Parquet => self::parquet::read_parquet(path, purpose),
    }
}

/// Write a batch in the requested format
pub fn write_table(path: &Path, batch: &RecordBatch, format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Csv => self::csv::write_csv(path, batch),
        ExportFormat::Parquet => self::parquet::write_parquet(path, batch),
    }
}

/// Concatenate batches, producing an empty batch for no input
pub(crate) fn concat_all(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<RecordBatch> {
    if batches.is_empty() {
        return Ok(RecordBatch::new_empty(schema.clone()));
    }
    Ok(concat_batches(schema, batches)?)
}
