//! Schema handling for the raw extracts and exported partitions.

pub mod adapt;
pub mod alignment;
pub mod validation;

pub use adapt::adapt_record_batch;
pub use alignment::{align_to, drop_columns, merge_extracts};
pub use validation::{ValidationReport, validate_categoricals};

use arrow::datatypes::{FieldRef, Schema};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::Result;
use crate::models::{RawStopRow, StopRow};

/// Arrow fields of the cleaned-record export schema
pub fn stop_row_fields() -> Result<Vec<FieldRef>> {
    Ok(Vec::<FieldRef>::from_type::<StopRow>(TracingOptions::default())?)
}

/// Arrow fields of the raw extract schema (all nullable text)
pub fn raw_row_fields() -> Result<Vec<FieldRef>> {
    Ok(Vec::<FieldRef>::from_type::<RawStopRow>(TracingOptions::default())?)
}

/// Schema built from a field list
#[must_use]
pub fn schema_of(fields: &[FieldRef]) -> Schema {
    Schema::new(fields.to_vec())
}
