//! Loading raw extracts and moving cleaned records to and from flat files.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use log::info;

use crate::config::{CleaningConfig, ExportFormat};
use crate::error::{Result, StopAnalysisError};
use crate::models::{RawStopRow, StopRecord, StopRow, columns};
use crate::schema::{adapt_record_batch, merge_extracts, raw_row_fields, schema_of, stop_row_fields};
use crate::utils::io::csv::read_csv_as_text;
use crate::utils::io::{read_table, write_table};

/// Read both raw extracts and merge them into one batch of text columns
pub fn load_merged_extracts(config: &CleaningConfig) -> Result<RecordBatch> {
    let current = read_csv_as_text(&config.current_extract, "current stop extract")?;
    let legacy = read_csv_as_text(&config.legacy_extract, "2016-17 stop extract")?;
    merge_extracts(
        &current,
        &config.current_drop_columns,
        &legacy,
        &config.legacy_drop_columns,
    )
}

/// Deserialize a merged text batch into raw rows
///
/// The batch must contain exactly the shared raw columns; anything else (an
/// audit column that was not dropped, a renamed field) is a schema mismatch.
pub fn raw_rows_from_batch(batch: &RecordBatch) -> Result<Vec<RawStopRow>> {
    let schema = batch.schema();
    let missing: Vec<&str> = columns::RAW_COLUMNS
        .iter()
        .copied()
        .filter(|c| schema.index_of(c).is_err())
        .collect();
    let unexpected: Vec<&str> = schema
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .filter(|name| !columns::RAW_COLUMNS.contains(name))
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(StopAnalysisError::SchemaMismatch(format!(
            "merged extract columns do not match; missing: [{}], unexpected: [{}]",
            missing.join(", "),
            unexpected.join(", ")
        )));
    }

    let typed = adapt_record_batch(batch, &schema_of(&raw_row_fields()?))?;
    let rows: Vec<RawStopRow> = serde_arrow::from_record_batch(&typed)?;
    Ok(rows)
}

/// Load and merge both extracts as raw rows
pub fn load_raw_rows(config: &CleaningConfig) -> Result<Vec<RawStopRow>> {
    let merged = load_merged_extracts(config)?;
    let rows = raw_rows_from_batch(&merged)?;
    info!("Loaded {} raw stop rows", rows.len());
    Ok(rows)
}

/// Convert cleaned records into a record batch with the export schema
pub fn records_to_batch(records: &[StopRecord]) -> Result<RecordBatch> {
    let fields = stop_row_fields()?;
    let rows: Vec<StopRow> = records.iter().map(StopRow::from).collect();
    Ok(serde_arrow::to_record_batch(&fields, &rows)?)
}

/// Convert a batch with (possibly text-typed) export columns back into records
pub fn records_from_batch(batch: &RecordBatch) -> Result<Vec<StopRecord>> {
    let typed = adapt_record_batch(batch, &schema_of(&stop_row_fields()?))?;
    let rows: Vec<StopRow> = serde_arrow::from_record_batch(&typed)?;
    rows.into_iter().map(StopRecord::try_from).collect()
}

/// Write cleaned records to `path` in the given format
pub fn export_records(path: &Path, records: &[StopRecord], format: ExportFormat) -> Result<()> {
    let batch = records_to_batch(records)?;
    write_table(path, &batch, format)
}

/// Read an exported partition (CSV or parquet, by extension)
pub fn load_records(path: &Path) -> Result<Vec<StopRecord>> {
    let batch = read_table(path, "exported stop partition")?;
    let records = records_from_batch(&batch)?;
    info!("Loaded {} cleaned records from {}", records.len(), path.display());
    Ok(records)
}
