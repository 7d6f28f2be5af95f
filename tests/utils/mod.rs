use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rand::prelude::*;
use stop_analysis::config::CleaningConfig;
use stop_analysis::models::columns;
use stop_analysis::{ArrestLabel, Outcome, RawStopRow, StopRecord};

pub const REASONS: [&str; 4] = ["Speeding", "Investigation", "SeatBelt", "Vehicle Regulatory"];
pub const DRIVER_RACES: [&str; 3] = ["White", "Black", "Asian"];
pub const DIVISIONS: [&str; 3] = ["Metro Division", "North Division", "South Division"];
pub const RESULTS: [&str; 4] = ["Arrest", "Citation Issued", "Verbal Warning", "No Action Taken"];

/// A valid raw row; `i` varies every categorical column
#[must_use]
pub fn raw_row(i: usize, month: &str, age: &str) -> RawStopRow {
    RawStopRow {
        month_of_stop: Some(month.to_string()),
        reason_for_stop: Some(REASONS[i % REASONS.len()].to_string()),
        officer_race: Some(
            ["White", "Black/African American", "Asian / Pacific Islander", "Hispanic/Latino"][i % 4]
                .to_string(),
        ),
        officer_gender: Some(["Male", "Female"][i % 2].to_string()),
        officer_years_of_service: Some((i % 20).to_string()),
        driver_race: Some(DRIVER_RACES[i % DRIVER_RACES.len()].to_string()),
        driver_ethnicity: Some(["Non-Hispanic", "Hispanic"][(i / 3) % 2].to_string()),
        driver_gender: Some(["Female", "Male"][(i / 2) % 2].to_string()),
        driver_age: Some(age.to_string()),
        was_a_search_conducted: Some(if i % 5 == 0 { "Yes" } else { "No" }.to_string()),
        result_of_stop: Some(RESULTS[i % RESULTS.len()].to_string()),
        cmpd_division: if i % 7 == 3 {
            None
        } else {
            Some(DIVISIONS[i % DIVISIONS.len()].to_string())
        },
    }
}

/// Rows split across both eras, with two under-age drivers
#[must_use]
pub fn raw_rows(n: usize) -> Vec<RawStopRow> {
    (0..n)
        .map(|i| {
            let month = if i % 3 == 0 { "2016/05" } else { "2020/02" };
            let age = match i {
                4 => "12".to_string(),
                9 => "14".to_string(),
                _ => (18 + i % 50).to_string(),
            };
            raw_row(i, month, &age)
        })
        .collect()
}

fn csv_value(value: Option<&str>) -> String {
    match value {
        Some(v) if v.contains(',') => format!("\"{v}\""),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// Write rows as a CSV extract with extra leading audit columns
pub fn write_extract(path: &Path, rows: &[RawStopRow], audit_columns: &[&str], reversed: bool) {
    let mut order: Vec<&str> = columns::RAW_COLUMNS.to_vec();
    if reversed {
        order.reverse();
    }
    let mut text = String::new();
    let header: Vec<&str> = audit_columns.iter().copied().chain(order.iter().copied()).collect();
    writeln!(text, "{}", header.join(",")).unwrap();
    for (i, row) in rows.iter().enumerate() {
        let audit = audit_columns.iter().map(|_| i.to_string());
        let values = order.iter().map(|c| csv_value(row.get(c)));
        writeln!(text, "{}", audit.chain(values).collect::<Vec<_>>().join(",")).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

/// Cleaning configuration reading both extracts from `dir` and writing to `dir/out`
#[must_use]
pub fn cleaning_config(dir: &Path) -> CleaningConfig {
    CleaningConfig {
        current_extract: dir.join("current.csv"),
        legacy_extract: dir.join("legacy.csv"),
        output_dir: dir.join("out"),
        ..CleaningConfig::default()
    }
}

/// Write a current and a legacy extract of `n` rows each into `dir`
pub fn write_extracts(dir: &Path, n: usize) -> (PathBuf, PathBuf) {
    let current = dir.join("current.csv");
    let legacy = dir.join("legacy.csv");
    write_extract(&current, &raw_rows(n), &["OBJECTID", "GlobalID"], false);
    write_extract(
        &legacy,
        &raw_rows(n),
        &["ObjectID", "CreationDate", "Creator", "EditDate", "Editor"],
        true,
    );
    (current, legacy)
}

/// A cleaned record with every field set from `i`
#[must_use]
pub fn record(i: usize, searched: bool) -> StopRecord {
    let driver_race = DRIVER_RACES[i % DRIVER_RACES.len()].to_string();
    let officer_race = ["White", "Black"][i % 2].to_string();
    let result = if i % 4 == 0 { "Arrest" } else { "Verbal Warning" };
    StopRecord {
        record_id: i as u64,
        month_of_stop: NaiveDate::from_ymd_opt(2020, 1 + (i % 12) as u32, 1).unwrap(),
        reason_for_stop: REASONS[i % REASONS.len()].to_string(),
        racial_match: u8::from(driver_race == officer_race),
        officer_race,
        officer_gender: (i % 2) as u8,
        officer_years_of_service: (i % 15) as f64,
        driver_race,
        driver_ethnicity: ((i / 2) % 2) as u8,
        driver_gender: ((i / 3) % 2) as u8,
        driver_age: 20.0 + (i % 40) as f64,
        was_a_search_conducted: u8::from(searched),
        result_of_stop: result.to_string(),
        cmpd_division: Some(DIVISIONS[i % DIVISIONS.len()].to_string()),
        outcome: Outcome::from_result_text(result),
        arrest: ArrestLabel::from_result_text(result),
    }
}

/// Records where searches follow the reason for stop, with a minority of searches
#[must_use]
pub fn synthetic_records(n: usize, seed: u64) -> Vec<StopRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let investigation = REASONS[i % REASONS.len()] == "Investigation";
            let searched = if investigation {
                rng.random::<f64>() < 0.8
            } else {
                rng.random::<f64>() < 0.05
            };
            record(i, searched)
        })
        .collect()
}
