//! Categorical encoding and derived columns.
//!
//! Binary labels use a pinned 0/1 assignment (alphabetical, as a label
//! encoder would produce) so downstream code can rely on which label is 1.

use crate::algorithm::cleaning::coercion::CoercedRow;
use crate::error::{Result, StopAnalysisError};
use crate::models::{ArrestLabel, Outcome, StopRecord, columns};

/// A two-label column and its fixed encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryEncoding {
    pub column: &'static str,
    /// Label encoded as 0
    pub zero: &'static str,
    /// Label encoded as 1
    pub one: &'static str,
}

impl BinaryEncoding {
    #[must_use]
    pub fn encode(&self, value: &str) -> Option<u8> {
        if value == self.zero {
            Some(0)
        } else if value == self.one {
            Some(1)
        } else {
            None
        }
    }

    #[must_use]
    pub fn decode(&self, code: u8) -> Option<&'static str> {
        match code {
            0 => Some(self.zero),
            1 => Some(self.one),
            _ => None,
        }
    }
}

pub const OFFICER_GENDER: BinaryEncoding = BinaryEncoding {
    column: columns::OFFICER_GENDER,
    zero: "Female",
    one: "Male",
};

pub const DRIVER_ETHNICITY: BinaryEncoding = BinaryEncoding {
    column: columns::DRIVER_ETHNICITY,
    zero: "Hispanic",
    one: "Non-Hispanic",
};

pub const DRIVER_GENDER: BinaryEncoding = BinaryEncoding {
    column: columns::DRIVER_GENDER,
    zero: "Female",
    one: "Male",
};

pub const WAS_A_SEARCH_CONDUCTED: BinaryEncoding = BinaryEncoding {
    column: columns::WAS_A_SEARCH_CONDUCTED,
    zero: "No",
    one: "Yes",
};

pub const BINARY_ENCODINGS: [BinaryEncoding; 4] = [
    OFFICER_GENDER,
    DRIVER_ETHNICITY,
    DRIVER_GENDER,
    WAS_A_SEARCH_CONDUCTED,
];

/// Officer race patterns in match order, with the driver-race bucket they map to
pub const OFFICER_RACE_BUCKETS: [(&str, &str); 4] = [
    ("White", "White"),
    ("Black/African American", "Black"),
    ("Asian / Pacific Islander", "Asian"),
    ("American Indian/Alaska Native", "Native American"),
];

/// Bucket for officer races matching none of the patterns
pub const OTHER_UNKNOWN: &str = "Other/Unknown";

/// Map officer race text onto the driver race categories; first match wins
#[must_use]
pub fn bucket_officer_race(officer_race: &str) -> &'static str {
    OFFICER_RACE_BUCKETS
        .iter()
        .find(|(pattern, _)| officer_race.contains(pattern))
        .map_or(OTHER_UNKNOWN, |&(_, bucket)| bucket)
}

fn field<'a>(row: &'a CoercedRow, column: &str) -> Result<&'a str> {
    row.raw.get(column).ok_or_else(|| StopAnalysisError::Parse {
        column: column.to_string(),
        row: usize::try_from(row.record_id).unwrap_or(usize::MAX),
        message: "required value is missing".to_string(),
    })
}

fn encode_binary(row: &CoercedRow, encoding: &BinaryEncoding) -> Result<u8> {
    let value = field(row, encoding.column)?;
    encoding.encode(value).ok_or_else(|| {
        StopAnalysisError::SchemaMismatch(format!(
            "{} value '{value}' at row {} is neither '{}' nor '{}'",
            encoding.column, row.record_id, encoding.zero, encoding.one
        ))
    })
}

/// Encode one coerced row into a cleaned record
pub fn encode_row(row: &CoercedRow) -> Result<StopRecord> {
    let result_of_stop = field(row, columns::RESULT_OF_STOP)?.to_string();
    let driver_race = field(row, columns::DRIVER_RACE)?.to_string();
    let officer_race = bucket_officer_race(field(row, columns::OFFICER_RACE)?).to_string();
    let racial_match = u8::from(driver_race == officer_race);

    Ok(StopRecord {
        record_id: row.record_id,
        month_of_stop: row.month_of_stop,
        reason_for_stop: field(row, columns::REASON_FOR_STOP)?.to_string(),
        officer_race,
        officer_gender: encode_binary(row, &OFFICER_GENDER)?,
        officer_years_of_service: row.officer_years_of_service,
        driver_race,
        driver_ethnicity: encode_binary(row, &DRIVER_ETHNICITY)?,
        driver_gender: encode_binary(row, &DRIVER_GENDER)?,
        driver_age: row.driver_age,
        was_a_search_conducted: encode_binary(row, &WAS_A_SEARCH_CONDUCTED)?,
        outcome: Outcome::from_result_text(&result_of_stop),
        arrest: ArrestLabel::from_result_text(&result_of_stop),
        result_of_stop,
        cmpd_division: row.raw.get(columns::CMPD_DIVISION).map(ToString::to_string),
        racial_match,
    })
}

/// Encode every row; the first failure aborts
pub fn encode_rows(rows: &[CoercedRow]) -> Result<Vec<StopRecord>> {
    rows.iter().map(encode_row).collect()
}
