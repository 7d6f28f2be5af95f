//! Stage 1 transforms: coercion, age filtering, encoding and diagnostics.
//!
//! Every function takes rows by reference and returns new rows.

pub mod coercion;
pub mod diagnostics;
pub mod encoding;

pub use coercion::{CoercedRow, coerce_rows, filter_driver_age, parse_month};
pub use diagnostics::{AgeDiagnostic, MissingnessReport, age_diagnostic, missingness_report};
pub use encoding::{bucket_officer_race, encode_row, encode_rows};
