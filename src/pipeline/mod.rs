//! The two batch stages: cleaning the raw extracts and modeling the cleaned split.

pub mod cleaning;
pub mod modeling;

use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::error::util::safe_create_file;

pub use cleaning::{CleanedData, clean_rows, run_cleaning, run_validation};
pub use modeling::{ExperimentReport, run_experiments};

/// Write a report as pretty-printed JSON
pub fn write_json_report<T: Serialize + ?Sized>(path: &Path, report: &T) -> Result<()> {
    let file = safe_create_file(path, "JSON report")?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    log::info!("Wrote report {}", path.display());
    Ok(())
}
