//! CSV reading and writing through arrow-csv.

use std::io::Seek;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::error::util::{safe_create_file, safe_open_file};
use crate::utils::io::{batch_size, concat_all};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Read a headed CSV file with every column as nullable text
pub fn read_csv_as_text(path: &Path, purpose: &str) -> Result<RecordBatch> {
    let start = Instant::now();
    log_operation_start("Reading CSV file", path);

    let mut file = safe_open_file(path, purpose)?;
    let format = Format::default().with_header(true);
    let (inferred, _) = format.infer_schema(&mut file, Some(100))?;
    file.rewind()?;

    // Excel exports prefix the first header with a byte-order mark
    let schema = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .map(|f| {
                Arc::new(Field::new(
                    f.name().trim_start_matches('\u{feff}').trim(),
                    DataType::Utf8,
                    true,
                ))
            })
            .collect::<Vec<_>>(),
    ));

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(batch_size())
        .build(file)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = concat_all(&schema, &batches)?;

    log_operation_complete("read", path, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}

/// Write a batch as a headed CSV file
pub fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let start = Instant::now();
    let file = safe_create_file(path, "CSV export")?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    log_operation_complete("wrote", path, batch.num_rows(), Some(start.elapsed()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, StringArray};

    #[test]
    fn test_csv_text_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        std::fs::write(&path, "\u{feff}Driver_Age,CMPD_Division\n31,North Division\n17,\n").unwrap();

        let batch = read_csv_as_text(&path, "test").unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "Driver_Age");
        let ages = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(ages.value(1), "17");

        let out = dir.path().join("out/copy.csv");
        write_csv(&out, &batch).unwrap();
        let again = read_csv_as_text(&out, "test").unwrap();
        assert_eq!(again.num_rows(), 2);
        assert_eq!(again.num_columns(), 2);
    }
}
