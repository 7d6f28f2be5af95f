//! Flat row structs used to move records in and out of Arrow record batches.
//!
//! `RawStopRow` mirrors the raw extracts (everything is optional text) and
//! `StopRow` is the export schema of a cleaned `StopRecord`. Both only contain
//! primitive fields so `serde_arrow` can trace their schema from the type.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StopAnalysisError};
use crate::models::stop::{StopRecord, columns};

/// Date format used for `Month_of_Stop` in exported partitions
pub const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of a raw extract after audit columns are dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStopRow {
    #[serde(rename = "Month_of_Stop")]
    pub month_of_stop: Option<String>,
    #[serde(rename = "Reason_for_Stop")]
    pub reason_for_stop: Option<String>,
    #[serde(rename = "Officer_Race")]
    pub officer_race: Option<String>,
    #[serde(rename = "Officer_Gender")]
    pub officer_gender: Option<String>,
    #[serde(rename = "Officer_Years_of_Service")]
    pub officer_years_of_service: Option<String>,
    #[serde(rename = "Driver_Race")]
    pub driver_race: Option<String>,
    #[serde(rename = "Driver_Ethnicity")]
    pub driver_ethnicity: Option<String>,
    #[serde(rename = "Driver_Gender")]
    pub driver_gender: Option<String>,
    #[serde(rename = "Driver_Age")]
    pub driver_age: Option<String>,
    #[serde(rename = "Was_a_Search_Conducted")]
    pub was_a_search_conducted: Option<String>,
    #[serde(rename = "Result_of_Stop")]
    pub result_of_stop: Option<String>,
    #[serde(rename = "CMPD_Division")]
    pub cmpd_division: Option<String>,
}

impl RawStopRow {
    /// Value of a raw column by name, empty strings read as missing
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        let value = match column {
            columns::MONTH_OF_STOP => &self.month_of_stop,
            columns::REASON_FOR_STOP => &self.reason_for_stop,
            columns::OFFICER_RACE => &self.officer_race,
            columns::OFFICER_GENDER => &self.officer_gender,
            columns::OFFICER_YEARS_OF_SERVICE => &self.officer_years_of_service,
            columns::DRIVER_RACE => &self.driver_race,
            columns::DRIVER_ETHNICITY => &self.driver_ethnicity,
            columns::DRIVER_GENDER => &self.driver_gender,
            columns::DRIVER_AGE => &self.driver_age,
            columns::WAS_A_SEARCH_CONDUCTED => &self.was_a_search_conducted,
            columns::RESULT_OF_STOP => &self.result_of_stop,
            columns::CMPD_DIVISION => &self.cmpd_division,
            _ => return None,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Export schema of a cleaned stop record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRow {
    pub record_id: u64,
    #[serde(rename = "Month_of_Stop")]
    pub month_of_stop: String,
    #[serde(rename = "Reason_for_Stop")]
    pub reason_for_stop: String,
    #[serde(rename = "Officer_Race")]
    pub officer_race: String,
    #[serde(rename = "Officer_Gender")]
    pub officer_gender: u8,
    #[serde(rename = "Officer_Years_of_Service")]
    pub officer_years_of_service: f64,
    #[serde(rename = "Driver_Race")]
    pub driver_race: String,
    #[serde(rename = "Driver_Ethnicity")]
    pub driver_ethnicity: u8,
    #[serde(rename = "Driver_Gender")]
    pub driver_gender: u8,
    #[serde(rename = "Driver_Age")]
    pub driver_age: f64,
    #[serde(rename = "Was_a_Search_Conducted")]
    pub was_a_search_conducted: u8,
    #[serde(rename = "Result_of_Stop")]
    pub result_of_stop: String,
    #[serde(rename = "CMPD_Division")]
    pub cmpd_division: Option<String>,
    #[serde(rename = "Outcome")]
    pub outcome: String,
    #[serde(rename = "Arrest")]
    pub arrest: String,
    #[serde(rename = "Racial_Match")]
    pub racial_match: u8,
}

impl From<&StopRecord> for StopRow {
    fn from(record: &StopRecord) -> Self {
        Self {
            record_id: record.record_id,
            month_of_stop: record.month_of_stop.format(EXPORT_DATE_FORMAT).to_string(),
            reason_for_stop: record.reason_for_stop.clone(),
            officer_race: record.officer_race.clone(),
            officer_gender: record.officer_gender,
            officer_years_of_service: record.officer_years_of_service,
            driver_race: record.driver_race.clone(),
            driver_ethnicity: record.driver_ethnicity,
            driver_gender: record.driver_gender,
            driver_age: record.driver_age,
            was_a_search_conducted: record.was_a_search_conducted,
            result_of_stop: record.result_of_stop.clone(),
            cmpd_division: record.cmpd_division.clone(),
            outcome: record.outcome.to_string(),
            arrest: record.arrest.to_string(),
            racial_match: record.racial_match,
        }
    }
}

impl TryFrom<StopRow> for StopRecord {
    type Error = StopAnalysisError;

    fn try_from(row: StopRow) -> Result<Self> {
        let month_of_stop = NaiveDate::parse_from_str(&row.month_of_stop, EXPORT_DATE_FORMAT)
            .map_err(|e| StopAnalysisError::Parse {
                column: columns::MONTH_OF_STOP.to_string(),
                row: usize::try_from(row.record_id).unwrap_or(usize::MAX),
                message: format!("'{}': {e}", row.month_of_stop),
            })?;

        Ok(Self {
            record_id: row.record_id,
            month_of_stop,
            reason_for_stop: row.reason_for_stop,
            officer_race: row.officer_race,
            officer_gender: row.officer_gender,
            officer_years_of_service: row.officer_years_of_service,
            driver_race: row.driver_race,
            driver_ethnicity: row.driver_ethnicity,
            driver_gender: row.driver_gender,
            driver_age: row.driver_age,
            was_a_search_conducted: row.was_a_search_conducted,
            result_of_stop: row.result_of_stop,
            // CSV round-trips write a missing division as an empty field
            cmpd_division: row.cmpd_division.filter(|d| !d.trim().is_empty()),
            outcome: row.outcome.parse()?,
            arrest: row.arrest.parse()?,
            racial_match: row.racial_match,
        })
    }
}
