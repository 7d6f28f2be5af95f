//! Adapting text-typed batches (as read from CSV) to a typed target schema.

use std::sync::Arc;

use arrow::array::{ArrayRef, new_null_array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{Result, StopAnalysisError};

/// Whether a cast from `from` to `to` is one this module performs
#[must_use]
pub fn is_adaptable(from: &DataType, to: &DataType) -> bool {
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (
            DataType::Utf8 | DataType::LargeUtf8,
            DataType::Utf8
                | DataType::LargeUtf8
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Int32
                | DataType::Int64
                | DataType::Float32
                | DataType::Float64
                | DataType::Boolean
                | DataType::Dictionary(_, _)
        ) | (
            DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32,
            DataType::UInt8 | DataType::UInt64 | DataType::Float64
        ) | (DataType::Float64, DataType::Float64 | DataType::Float32)
    )
}

/// Convert a record batch to the target schema
///
/// Columns are matched by name and cast; a column that is missing from the
/// batch becomes all-null and is rejected later if the target field is not
/// nullable.
pub fn adapt_record_batch(batch: &RecordBatch, target_schema: &Schema) -> Result<RecordBatch> {
    let source_schema = batch.schema();
    let mut adapted: Vec<ArrayRef> = Vec::with_capacity(target_schema.fields().len());

    for target_field in target_schema.fields() {
        let name = target_field.name();
        let target_type = target_field.data_type();

        match source_schema.index_of(name) {
            Ok(idx) => {
                let column = batch.column(idx);
                if column.data_type() == target_type {
                    adapted.push(column.clone());
                } else if is_adaptable(column.data_type(), target_type) {
                    debug!("Casting {name}: {:?} -> {target_type:?}", column.data_type());
                    adapted.push(cast(column, target_type)?);
                } else {
                    return Err(StopAnalysisError::SchemaMismatch(format!(
                        "incompatible types for field '{name}': {:?} -> {target_type:?}",
                        column.data_type()
                    )));
                }
            }
            Err(_) => {
                debug!("Column {name} absent, filling with nulls");
                adapted.push(new_null_array(target_type, batch.num_rows()));
            }
        }
    }

    Ok(RecordBatch::try_new(Arc::new(target_schema.clone()), adapted)?)
}
