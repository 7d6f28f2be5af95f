//! The cleaned traffic-stop record and its derived labels.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StopAnalysisError;

/// Column names as they appear in the extracts and exported partitions
pub mod columns {
    pub const RECORD_ID: &str = "record_id";
    pub const MONTH_OF_STOP: &str = "Month_of_Stop";
    pub const REASON_FOR_STOP: &str = "Reason_for_Stop";
    pub const OFFICER_RACE: &str = "Officer_Race";
    pub const OFFICER_GENDER: &str = "Officer_Gender";
    pub const OFFICER_YEARS_OF_SERVICE: &str = "Officer_Years_of_Service";
    pub const DRIVER_RACE: &str = "Driver_Race";
    pub const DRIVER_ETHNICITY: &str = "Driver_Ethnicity";
    pub const DRIVER_GENDER: &str = "Driver_Gender";
    pub const DRIVER_AGE: &str = "Driver_Age";
    pub const WAS_A_SEARCH_CONDUCTED: &str = "Was_a_Search_Conducted";
    pub const RESULT_OF_STOP: &str = "Result_of_Stop";
    pub const CMPD_DIVISION: &str = "CMPD_Division";
    pub const OUTCOME: &str = "Outcome";
    pub const ARREST: &str = "Arrest";
    pub const RACIAL_MATCH: &str = "Racial_Match";
    pub const GENDER_MATCH: &str = "Gender_Match";

    /// Columns both raw extracts share once their audit columns are dropped
    pub const RAW_COLUMNS: [&str; 12] = [
        MONTH_OF_STOP,
        REASON_FOR_STOP,
        OFFICER_RACE,
        OFFICER_GENDER,
        OFFICER_YEARS_OF_SERVICE,
        DRIVER_RACE,
        DRIVER_ETHNICITY,
        DRIVER_GENDER,
        DRIVER_AGE,
        WAS_A_SEARCH_CONDUCTED,
        RESULT_OF_STOP,
        CMPD_DIVISION,
    ];
}

/// Three-way collapse of the result of a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Outcome {
    Arrest,
    Citation,
    WarningOrNoAction,
}

impl Outcome {
    /// "Arrest" anywhere wins, then "Citation Issued", everything else is a warning
    #[must_use]
    pub fn from_result_text(result: &str) -> Self {
        if result.contains("Arrest") {
            Self::Arrest
        } else if result.contains("Citation Issued") {
            Self::Citation
        } else {
            Self::WarningOrNoAction
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arrest => "Arrest",
            Self::Citation => "Citation",
            Self::WarningOrNoAction => "Warning/No Action",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = StopAnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Arrest" => Ok(Self::Arrest),
            "Citation" => Ok(Self::Citation),
            "Warning/No Action" => Ok(Self::WarningOrNoAction),
            other => Err(StopAnalysisError::SchemaMismatch(format!(
                "unknown Outcome value '{other}'"
            ))),
        }
    }
}

/// Binary collapse of the result of a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrestLabel {
    Arrest,
    Other,
}

impl ArrestLabel {
    #[must_use]
    pub fn from_result_text(result: &str) -> Self {
        if result.contains("Arrest") {
            Self::Arrest
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arrest => "Arrest",
            Self::Other => "Other",
        }
    }

    /// Positive class (arrest) is 1
    #[must_use]
    pub fn as_class(self) -> usize {
        match self {
            Self::Arrest => 1,
            Self::Other => 0,
        }
    }
}

impl fmt::Display for ArrestLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArrestLabel {
    type Err = StopAnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Arrest" => Ok(Self::Arrest),
            "Other" => Ok(Self::Other),
            other => Err(StopAnalysisError::SchemaMismatch(format!(
                "unknown Arrest value '{other}'"
            ))),
        }
    }
}

/// Binary prediction targets available for modeling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    SearchConducted,
    Arrest,
}

impl Target {
    pub const ALL: [Self; 2] = [Self::SearchConducted, Self::Arrest];

    #[must_use]
    pub fn column_name(self) -> &'static str {
        match self {
            Self::SearchConducted => columns::WAS_A_SEARCH_CONDUCTED,
            Self::Arrest => columns::ARREST,
        }
    }

    /// Resolve a column name to a target, `None` if the frame has no such target
    #[must_use]
    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.column_name() == name)
    }

    /// Class label (0/1) of a record for this target
    #[must_use]
    pub fn label_of(self, record: &StopRecord) -> usize {
        match self {
            Self::SearchConducted => usize::from(record.was_a_search_conducted),
            Self::Arrest => record.arrest.as_class(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One cleaned traffic stop
#[derive(Debug, Clone, PartialEq)]
pub struct StopRecord {
    /// Position in the merged table
    pub record_id: u64,
    /// First day of the month the stop happened in
    pub month_of_stop: NaiveDate,
    pub reason_for_stop: String,
    /// Bucketed into the driver race categories
    pub officer_race: String,
    /// 0 female, 1 male
    pub officer_gender: u8,
    pub officer_years_of_service: f64,
    pub driver_race: String,
    /// 0 Hispanic, 1 Non-Hispanic
    pub driver_ethnicity: u8,
    /// 0 female, 1 male
    pub driver_gender: u8,
    pub driver_age: f64,
    /// 0 no, 1 yes
    pub was_a_search_conducted: u8,
    pub result_of_stop: String,
    pub cmpd_division: Option<String>,
    pub outcome: Outcome,
    pub arrest: ArrestLabel,
    /// 1 when driver race equals the officer race bucket
    pub racial_match: u8,
}

impl StopRecord {
    /// Whether any nullable field is missing
    #[must_use]
    pub fn has_missing(&self) -> bool {
        self.cmpd_division.is_none()
    }
}
