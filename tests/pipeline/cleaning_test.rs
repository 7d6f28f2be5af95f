use std::collections::HashSet;

use stop_analysis::config::{CleaningConfig, ExportFormat};
use stop_analysis::error::StopAnalysisError;
use stop_analysis::loader::load_records;
use stop_analysis::models::{ArrestLabel, Outcome};
use stop_analysis::pipeline::{clean_rows, run_cleaning, run_validation};

use crate::utils::{cleaning_config, raw_row, raw_rows, write_extracts};

#[test]
fn test_clean_rows_drops_underage_drivers() {
    let config = cleaning_config(std::path::Path::new("unused"));
    let rows = raw_rows(30);
    let cleaned = clean_rows(&rows, &config).unwrap();

    assert_eq!(cleaned.age_diagnostic.flagged_rows, 2);
    assert_eq!(cleaned.records.len(), 28);
    assert!(cleaned.records.iter().all(|r| r.driver_age >= 15.0));
}

#[test]
fn test_clean_rows_keeps_underage_when_configured() {
    let mut config = cleaning_config(std::path::Path::new("unused"));
    config.drop_underage = false;
    let cleaned = clean_rows(&raw_rows(30), &config).unwrap();
    assert_eq!(cleaned.records.len(), 30);
}

#[test]
fn test_cleaned_columns_are_encoded() {
    let config = cleaning_config(std::path::Path::new("unused"));
    let cleaned = clean_rows(&raw_rows(40), &config).unwrap();

    for record in &cleaned.records {
        assert!(record.officer_gender <= 1);
        assert!(record.driver_gender <= 1);
        assert!(record.driver_ethnicity <= 1);
        assert!(record.was_a_search_conducted <= 1);
        assert!(record.racial_match <= 1);
        assert_eq!(
            record.racial_match == 1,
            record.driver_race == record.officer_race
        );
        let expected = match record.result_of_stop.as_str() {
            "Arrest" => Outcome::Arrest,
            "Citation Issued" => Outcome::Citation,
            _ => Outcome::WarningOrNoAction,
        };
        assert_eq!(record.outcome, expected);
    }
}

#[test]
fn test_officer_race_bucketed_to_driver_vocabulary() {
    let config = cleaning_config(std::path::Path::new("unused"));
    let cleaned = clean_rows(&raw_rows(8), &config).unwrap();
    let races: HashSet<&str> = cleaned
        .records
        .iter()
        .map(|r| r.officer_race.as_str())
        .collect();
    assert!(races.contains("Black"));
    assert!(races.contains("Asian"));
    assert!(!races.contains("Black/African American"));
}

#[test]
fn test_default_config_cleans_detailed_result_texts() {
    let mut rows: Vec<_> = (0..8).map(|i| raw_row(i, "2020/02", "30")).collect();
    rows[0].result_of_stop = Some("Citation Issued - Speeding".to_string());
    rows[1].result_of_stop = Some("Arrest for DWI".to_string());
    rows[2].officer_race = Some("Asian / Pacific Islander".to_string());
    rows[3].driver_age = Some("12".to_string());

    let cleaned = clean_rows(&rows, &CleaningConfig::default()).unwrap();
    assert!(cleaned.validation.is_clean());
    assert_eq!(cleaned.records.len(), 7);
    assert!(cleaned.records.iter().all(|r| r.driver_age >= 15.0));

    let by_result = |text: &str| {
        cleaned
            .records
            .iter()
            .find(|r| r.result_of_stop == text)
            .unwrap()
    };
    let citation = by_result("Citation Issued - Speeding");
    assert_eq!(citation.outcome, Outcome::Citation);
    assert_eq!(citation.arrest, ArrestLabel::Other);
    let arrest = by_result("Arrest for DWI");
    assert_eq!(arrest.outcome, Outcome::Arrest);
    assert_eq!(arrest.arrest, ArrestLabel::Arrest);

    let officer = cleaned.records.iter().find(|r| r.record_id == 2).unwrap();
    assert_eq!(officer.officer_race, "Asian");
}

#[test]
fn test_strict_validation_rejects_unknown_values() {
    let config = cleaning_config(std::path::Path::new("unused"));
    let mut rows = raw_rows(10);
    rows[2].reason_for_stop = Some("Jaywalking".to_string());

    let err = clean_rows(&rows, &config).unwrap_err();
    assert!(matches!(err, StopAnalysisError::UnexpectedValues(_)), "{err}");

    let mut lenient = config.clone();
    lenient.strict_validation = false;
    assert!(clean_rows(&rows, &lenient).is_ok());
}

#[test]
fn test_unparseable_month_is_an_error() {
    let config = cleaning_config(std::path::Path::new("unused"));
    let rows = vec![raw_row(1, "sometime", "30")];
    assert!(clean_rows(&rows, &config).is_err());
}

#[test]
fn test_run_validation_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    write_extracts(dir.path(), 12);
    let config = cleaning_config(dir.path());

    let report = run_validation(&config).unwrap();
    assert_eq!(report.rows, 24);
    assert!(report.is_clean());
    assert!(config.output_dir.join("validation_report.json").exists());
}

#[test]
fn test_run_cleaning_exports_every_partition() {
    let dir = tempfile::tempdir().unwrap();
    write_extracts(dir.path(), 30);
    let config = cleaning_config(dir.path());

    let cleaned = run_cleaning(&config).unwrap();
    assert_eq!(cleaned.records.len(), 56);

    for (name, records) in cleaned.partitions.named() {
        let path = config.output_dir.join(format!("{name}.csv"));
        assert!(path.exists(), "missing {name}");
        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded.len(), records.len(), "row count of {name}");
    }
    for report in [
        "validation_report.json",
        "age_diagnostic.json",
        "missingness_report.json",
        "partitions.json",
    ] {
        assert!(config.output_dir.join(report).exists(), "missing {report}");
    }
}

#[test]
fn test_exported_records_load_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    write_extracts(dir.path(), 20);
    let mut config = cleaning_config(dir.path());
    config.export_format = ExportFormat::Parquet;

    let cleaned = run_cleaning(&config).unwrap();
    let loaded = load_records(&config.output_dir.join("stops_all.parquet")).unwrap();
    assert_eq!(loaded, cleaned.partitions.all);
}

#[test]
fn test_strict_run_writes_report_before_failing() {
    let dir = tempfile::tempdir().unwrap();
    let config = cleaning_config(dir.path());
    let mut rows = raw_rows(6);
    rows[0].driver_race = Some("Martian".to_string());
    crate::utils::write_extract(&config.current_extract, &rows, &["OBJECTID", "GlobalID"], false);
    crate::utils::write_extract(
        &config.legacy_extract,
        &raw_rows(6),
        &["ObjectID", "CreationDate", "Creator", "EditDate", "Editor"],
        false,
    );

    assert!(run_cleaning(&config).is_err());
    assert!(config.output_dir.join("validation_report.json").exists());
}
