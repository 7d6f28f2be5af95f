//! Stage 1: merge, validate, coerce, filter, encode, partition and export.

use std::path::Path;
use std::time::Instant;

use log::info;
use serde::Serialize;

use crate::algorithm::cleaning::{
    AgeDiagnostic, MissingnessReport, age_diagnostic, coerce_rows, encode_rows, filter_driver_age,
    missingness_report,
};
use crate::algorithm::partition::{PartitionSize, Partitions};
use crate::config::CleaningConfig;
use crate::error::Result;
use crate::error::util::ensure_directory;
use crate::loader::{export_records, load_raw_rows};
use crate::models::{RawStopRow, StopRecord};
use crate::pipeline::write_json_report;
use crate::schema::{ValidationReport, validate_categoricals};
use crate::utils::logging::{log_block, log_operation_complete, log_operation_start, log_warning};

pub const VALIDATION_REPORT: &str = "validation_report.json";
pub const AGE_DIAGNOSTIC_REPORT: &str = "age_diagnostic.json";
pub const MISSINGNESS_REPORT: &str = "missingness_report.json";
pub const PARTITION_SUMMARY: &str = "partitions.json";

/// Everything stage 1 produces from the raw rows
#[derive(Debug, Clone)]
pub struct CleanedData {
    pub validation: ValidationReport,
    pub age_diagnostic: AgeDiagnostic,
    pub records: Vec<StopRecord>,
    pub partitions: Partitions,
    pub missingness: MissingnessReport,
}

#[derive(Debug, Serialize)]
struct CleaningSummary<'a> {
    raw_rows: usize,
    cleaned_rows: usize,
    partitions: &'a [PartitionSize],
}

/// Abort in strict mode when the report flags anything; otherwise warn
fn enforce_validation(report: &ValidationReport, strict: bool) -> Result<()> {
    if report.is_clean() {
        info!("Categorical validation passed for {} rows", report.rows);
        return Ok(());
    }
    log_block("Categorical validation flagged values", &report.to_string());
    if strict {
        report.ensure_clean()
    } else {
        log_warning(
            &format!(
                "{} unexpected categorical values; continuing (strict validation is off)",
                report.flagged().len()
            ),
            None,
        );
        Ok(())
    }
}

/// Coerce, diagnose, filter, encode and partition rows that were validated
fn clean_validated(
    rows: &[RawStopRow],
    validation: ValidationReport,
    config: &CleaningConfig,
) -> Result<CleanedData> {
    let coerced = coerce_rows(rows, &config.month_formats)?;

    let age_diagnostic = age_diagnostic(&coerced, config.min_driver_age);
    log_block("Driver age diagnostic", &age_diagnostic.to_string());
    let coerced = if config.drop_underage {
        filter_driver_age(&coerced, config.min_driver_age)
    } else {
        coerced
    };

    let records = encode_rows(&coerced)?;
    let partitions = Partitions::build(
        &records,
        config.era_threshold,
        config.test_fraction,
        config.split_seed,
    );
    let missingness = missingness_report("stops_2020", &partitions.post);
    log_block("Missing values in the modeling era", &missingness.to_string());

    Ok(CleanedData {
        validation,
        age_diagnostic,
        records,
        partitions,
        missingness,
    })
}

/// Run stage 1 on already-loaded raw rows, without touching the filesystem
pub fn clean_rows(rows: &[RawStopRow], config: &CleaningConfig) -> Result<CleanedData> {
    let validation = validate_categoricals(rows, &config.allow_lists);
    enforce_validation(&validation, config.strict_validation)?;
    clean_validated(rows, validation, config)
}

/// Load and merge the extracts, then write and log the validation report
pub fn run_validation(config: &CleaningConfig) -> Result<ValidationReport> {
    let rows = load_raw_rows(config)?;
    let report = validate_categoricals(&rows, &config.allow_lists);
    log_block("Categorical validation", &report.to_string());
    ensure_directory(&config.output_dir, "cleaning reports")?;
    write_json_report(&config.output_dir.join(VALIDATION_REPORT), &report)?;
    Ok(report)
}

/// Write every partition and report of `cleaned` under `output_dir`
pub fn export_cleaned(cleaned: &CleanedData, raw_rows: usize, config: &CleaningConfig) -> Result<()> {
    let dir: &Path = &config.output_dir;
    ensure_directory(dir, "cleaned partitions")?;

    for (name, records) in cleaned.partitions.named() {
        let path = dir.join(format!("{name}.{}", config.export_format.extension()));
        export_records(&path, records, config.export_format)?;
    }

    write_json_report(&dir.join(AGE_DIAGNOSTIC_REPORT), &cleaned.age_diagnostic)?;
    write_json_report(&dir.join(MISSINGNESS_REPORT), &cleaned.missingness)?;
    let sizes = cleaned.partitions.sizes();
    write_json_report(
        &dir.join(PARTITION_SUMMARY),
        &CleaningSummary {
            raw_rows,
            cleaned_rows: cleaned.records.len(),
            partitions: &sizes,
        },
    )
}

/// Stage 1 end to end: load, validate, clean and export
///
/// The validation report is written before strict validation can abort.
pub fn run_cleaning(config: &CleaningConfig) -> Result<CleanedData> {
    let start = Instant::now();
    log_operation_start("Cleaning stop extracts into", &config.output_dir);

    let rows = load_raw_rows(config)?;
    let validation = validate_categoricals(&rows, &config.allow_lists);
    ensure_directory(&config.output_dir, "cleaning reports")?;
    write_json_report(&config.output_dir.join(VALIDATION_REPORT), &validation)?;
    enforce_validation(&validation, config.strict_validation)?;

    let cleaned = clean_validated(&rows, validation, config)?;
    export_cleaned(&cleaned, rows.len(), config)?;

    log_operation_complete(
        "cleaned",
        &config.output_dir,
        cleaned.records.len(),
        Some(start.elapsed()),
    );
    Ok(cleaned)
}
