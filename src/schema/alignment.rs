//! Column-set reconciliation between the two raw extracts.

use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use log::{debug, info};

use crate::error::{Result, StopAnalysisError};

/// Drop the named columns from a batch; names that are not present are ignored
pub fn drop_columns(batch: &RecordBatch, names: &[String]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !names.iter().any(|n| n == f.name()))
        .map(|(i, _)| i)
        .collect();

    let dropped = schema.fields().len() - keep.len();
    debug!("Dropping {dropped} of {} requested columns", names.len());
    Ok(batch.project(&keep)?)
}

/// Column names that appear in one schema but not the other
#[must_use]
pub fn column_difference(left: &Schema, right: &Schema) -> (Vec<String>, Vec<String>) {
    let only_left = left
        .fields()
        .iter()
        .filter(|f| right.index_of(f.name()).is_err())
        .map(|f| f.name().clone())
        .collect();
    let only_right = right
        .fields()
        .iter()
        .filter(|f| left.index_of(f.name()).is_err())
        .map(|f| f.name().clone())
        .collect();
    (only_left, only_right)
}

/// Reorder `batch` to the column order of `reference`
///
/// Fails with a schema mismatch when the column sets differ.
pub fn align_to(batch: &RecordBatch, reference: &Schema) -> Result<RecordBatch> {
    let schema = batch.schema();
    let (missing, extra) = column_difference(reference, &schema);
    if !missing.is_empty() || !extra.is_empty() {
        return Err(StopAnalysisError::SchemaMismatch(format!(
            "column sets differ after dropping audit columns; missing: [{}], unexpected: [{}]",
            missing.join(", "),
            extra.join(", ")
        )));
    }

    let order = reference
        .fields()
        .iter()
        .map(|f| schema.index_of(f.name()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let projected = batch.project(&order)?;

    // Column types must line up for concatenation
    let columns = projected.columns().to_vec();
    Ok(RecordBatch::try_new(Arc::new(reference.clone()), columns)?)
}

/// Concatenate two extracts after dropping their audit columns
///
/// Rows keep their order: all of `first`, then all of `second`.
pub fn merge_extracts(
    first: &RecordBatch,
    first_drop: &[String],
    second: &RecordBatch,
    second_drop: &[String],
) -> Result<RecordBatch> {
    let first = drop_columns(first, first_drop)?;
    let second = drop_columns(second, second_drop)?;
    let schema = first.schema();
    let second = align_to(&second, &schema)?;

    let merged = concat_batches(&schema, [&first, &second])?;
    info!(
        "Merged extracts: {} + {} rows -> {} rows, {} columns",
        first.num_rows(),
        second.num_rows(),
        merged.num_rows(),
        merged.num_columns()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, ArrayRef, StringArray};
    use arrow::datatypes::{DataType, Field};

    fn batch(columns: Vec<(&str, Vec<&str>)>) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = columns
            .iter()
            .map(|(_, values)| Arc::new(StringArray::from(values.clone())) as ArrayRef)
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    #[test]
    fn test_merge_drops_audit_columns_and_aligns_order() {
        let current = batch(vec![
            ("OBJECTID", vec!["1"]),
            ("Driver_Age", vec!["30"]),
            ("Driver_Race", vec!["White"]),
            ("GlobalID", vec!["g"]),
        ]);
        let legacy = batch(vec![
            ("Driver_Race", vec!["Black", "Asian"]),
            ("Editor", vec!["e", "e"]),
            ("Driver_Age", vec!["41", "52"]),
            ("ObjectID", vec!["9", "10"]),
        ]);

        let merged = merge_extracts(
            &current,
            &["OBJECTID".to_string(), "GlobalID".to_string()],
            &legacy,
            &["ObjectID".to_string(), "Editor".to_string()],
        )
        .unwrap();

        assert_eq!(merged.num_rows(), 3);
        let names: Vec<_> = merged.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["Driver_Age", "Driver_Race"]);

        let ages = merged.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(ages.value(0), "30");
        assert_eq!(ages.value(1), "41");
        assert_eq!(ages.value(2), "52");
        assert_eq!(ages.len(), 3);
    }

    #[test]
    fn test_merge_rejects_leftover_columns() {
        let current = batch(vec![("Driver_Age", vec!["30"]), ("GlobalID", vec!["g"])]);
        let legacy = batch(vec![("Driver_Age", vec!["41"])]);

        let err = merge_extracts(&current, &[], &legacy, &[]).unwrap_err();
        assert!(matches!(err, StopAnalysisError::SchemaMismatch(_)));
        assert!(err.to_string().contains("GlobalID"));
    }
}
