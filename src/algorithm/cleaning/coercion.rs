//! Type coercion of raw rows and the driver-age filter.

use chrono::{Datelike, NaiveDate};
use log::info;

use crate::error::{Result, StopAnalysisError};
use crate::models::{RawStopRow, columns};

/// A raw row whose date and numeric fields have been parsed
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedRow {
    /// Position in the merged table
    pub record_id: u64,
    /// First day of the stop month
    pub month_of_stop: NaiveDate,
    pub officer_years_of_service: f64,
    pub driver_age: f64,
    /// Categorical text fields, untouched
    pub raw: RawStopRow,
}

/// Parse a month value with the first matching format, truncated to day 1
///
/// Formats without a day directive (`%Y/%m`) are completed with day 1.
#[must_use]
pub fn parse_month(value: &str, formats: &[String]) -> Option<NaiveDate> {
    let value = value.trim();
    formats.iter().find_map(|format| {
        let parsed = if format.contains("%d") {
            NaiveDate::parse_from_str(value, format)
        } else {
            NaiveDate::parse_from_str(&format!("{value}|01"), &format!("{format}|%d"))
        };
        parsed.ok().and_then(|d| d.with_day(1))
    })
}

fn parse_error(column: &str, row: usize, message: impl Into<String>) -> StopAnalysisError {
    StopAnalysisError::Parse {
        column: column.to_string(),
        row,
        message: message.into(),
    }
}

fn required<'a>(raw: &'a RawStopRow, column: &str, row: usize) -> Result<&'a str> {
    raw.get(column)
        .ok_or_else(|| parse_error(column, row, "required value is missing"))
}

fn parse_number(raw: &RawStopRow, column: &str, row: usize) -> Result<f64> {
    let value = required(raw, column, row)?;
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| parse_error(column, row, format!("'{value}' is not a number")))
}

/// Coerce every row, assigning record ids in merged order
///
/// Any unparseable month, age or years-of-service value is an error; the
/// rows are never repaired.
pub fn coerce_rows(rows: &[RawStopRow], month_formats: &[String]) -> Result<Vec<CoercedRow>> {
    rows.iter()
        .enumerate()
        .map(|(idx, raw)| {
            let month_text = required(raw, columns::MONTH_OF_STOP, idx)?;
            let month_of_stop = parse_month(month_text, month_formats).ok_or_else(|| {
                parse_error(
                    columns::MONTH_OF_STOP,
                    idx,
                    format!("'{month_text}' matches none of {month_formats:?}"),
                )
            })?;

            Ok(CoercedRow {
                record_id: idx as u64,
                month_of_stop,
                officer_years_of_service: parse_number(raw, columns::OFFICER_YEARS_OF_SERVICE, idx)?,
                driver_age: parse_number(raw, columns::DRIVER_AGE, idx)?,
                raw: raw.clone(),
            })
        })
        .collect()
}

/// Keep rows whose driver is at least `min_age` years old
#[must_use]
pub fn filter_driver_age(rows: &[CoercedRow], min_age: f64) -> Vec<CoercedRow> {
    let kept: Vec<CoercedRow> = rows
        .iter()
        .filter(|r| r.driver_age >= min_age)
        .cloned()
        .collect();
    info!(
        "Driver age filter (>= {min_age}): kept {} of {} rows",
        kept.len(),
        rows.len()
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningConfig;

    fn raw(month: &str, age: &str) -> RawStopRow {
        RawStopRow {
            month_of_stop: Some(month.to_string()),
            driver_age: Some(age.to_string()),
            officer_years_of_service: Some("7".to_string()),
            ..RawStopRow::default()
        }
    }

    #[test]
    fn test_parse_month_formats() {
        let formats = CleaningConfig::default().month_formats;
        let jan = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(parse_month("2020/01", &formats), Some(jan));
        assert_eq!(parse_month("2020-01", &formats), Some(jan));
        assert_eq!(parse_month("2020-01-17", &formats), Some(jan));
        assert_eq!(parse_month("2020/13", &formats), None);
        assert_eq!(parse_month("January", &formats), None);
    }

    #[test]
    fn test_coerce_assigns_ids_in_order() {
        let formats = CleaningConfig::default().month_formats;
        let rows = coerce_rows(&[raw("2016/03", "44"), raw("2020/11", "19")], &formats).unwrap();
        assert_eq!(rows[0].record_id, 0);
        assert_eq!(rows[1].record_id, 1);
        assert_eq!(rows[1].month_of_stop, NaiveDate::from_ymd_opt(2020, 11, 1).unwrap());
        assert_eq!(rows[0].driver_age, 44.0);
    }

    #[test]
    fn test_bad_age_is_reported_with_row() {
        let formats = CleaningConfig::default().month_formats;
        let err = coerce_rows(&[raw("2020/01", "30"), raw("2020/01", "abc")], &formats).unwrap_err();
        match err {
            StopAnalysisError::Parse { column, row, .. } => {
                assert_eq!(column, "Driver_Age");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_age_filter_excludes_twelve_year_old() {
        let formats = CleaningConfig::default().month_formats;
        let rows = coerce_rows(&[raw("2020/01", "12"), raw("2020/01", "15")], &formats).unwrap();
        let kept = filter_driver_age(&rows, 15.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].driver_age, 15.0);
    }
}
