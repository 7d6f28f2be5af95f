//! Parquet reading and writing for exported partitions.

use std::path::Path;
use std::time::Instant;

use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::error::util::{safe_create_file, safe_open_file};
use crate::utils::io::{batch_size, concat_all};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Read a parquet file into a single record batch
pub fn read_parquet(path: &Path, purpose: &str) -> Result<RecordBatch> {
    let start = Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = safe_open_file(path, purpose)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.with_batch_size(batch_size()).build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = concat_all(&schema, &batches)?;

    log_operation_complete("read", path, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}

/// Write a batch to a parquet file
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let start = Instant::now();
    let file = safe_create_file(path, "parquet export")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    log_operation_complete("wrote", path, batch.num_rows(), Some(start.elapsed()));
    Ok(())
}
