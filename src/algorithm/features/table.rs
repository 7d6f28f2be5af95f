//! The modeling table: feature columns of each stop plus one binary target.

use crate::models::{StopRecord, Target, columns};

/// Columns treated as categorical when resampling, in storage order
pub const CATEGORICAL_COLUMNS: [&str; 8] = [
    columns::REASON_FOR_STOP,
    columns::OFFICER_RACE,
    columns::OFFICER_GENDER,
    columns::DRIVER_RACE,
    columns::DRIVER_ETHNICITY,
    columns::DRIVER_GENDER,
    columns::CMPD_DIVISION,
    columns::RACIAL_MATCH,
];

/// Columns treated as continuous when resampling, in storage order
pub const CONTINUOUS_COLUMNS: [&str; 2] = [columns::OFFICER_YEARS_OF_SERVICE, columns::DRIVER_AGE];

/// Value used for a missing division in the categorical slots
pub const MISSING_CATEGORY: &str = "";

/// Feature columns of one stop, without bookkeeping or targets
///
/// Binary-encoded columns are kept as `"0"`/`"1"` text so every
/// categorical can be resampled the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct StopFeatures {
    pub categorical: [String; 8],
    pub continuous: [f64; 2],
}

impl StopFeatures {
    #[must_use]
    pub fn from_record(record: &StopRecord) -> Self {
        Self {
            categorical: [
                record.reason_for_stop.clone(),
                record.officer_race.clone(),
                record.officer_gender.to_string(),
                record.driver_race.clone(),
                record.driver_ethnicity.to_string(),
                record.driver_gender.to_string(),
                record
                    .cmpd_division
                    .clone()
                    .unwrap_or_else(|| MISSING_CATEGORY.to_string()),
                record.racial_match.to_string(),
            ],
            continuous: [record.officer_years_of_service, record.driver_age],
        }
    }

    /// Categorical value by column name
    #[must_use]
    pub fn categorical(&self, column: &str) -> Option<&str> {
        CATEGORICAL_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.categorical[i].as_str())
    }

    /// Continuous value by column name
    #[must_use]
    pub fn continuous(&self, column: &str) -> Option<f64> {
        CONTINUOUS_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.continuous[i])
    }

    /// Binary categorical as a number; anything but `"1"` counts as 0
    #[must_use]
    pub fn flag(&self, column: &str) -> f64 {
        match self.categorical(column) {
            Some("1") => 1.0,
            _ => 0.0,
        }
    }
}

/// Feature rows with the labels of a single target
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    pub target: Target,
    pub rows: Vec<StopFeatures>,
    /// 0/1 class of each row
    pub labels: Vec<usize>,
}

impl LabeledTable {
    /// Build the table without any resampling
    #[must_use]
    pub fn from_records(records: &[StopRecord], target: Target) -> Self {
        Self {
            target,
            rows: records.iter().map(StopFeatures::from_record).collect(),
            labels: records.iter().map(|r| target.label_of(r)).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Count of rows per class, `[negatives, positives]`
    #[must_use]
    pub fn class_counts(&self) -> [usize; 2] {
        let positives = self.labels.iter().filter(|&&l| l == 1).count();
        [self.labels.len() - positives, positives]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArrestLabel, Outcome};
    use chrono::NaiveDate;

    #[test]
    fn test_features_of_record() {
        let record = StopRecord {
            record_id: 3,
            month_of_stop: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            reason_for_stop: "Speeding".to_string(),
            officer_race: "Black".to_string(),
            officer_gender: 1,
            officer_years_of_service: 12.0,
            driver_race: "White".to_string(),
            driver_ethnicity: 1,
            driver_gender: 0,
            driver_age: 40.0,
            was_a_search_conducted: 1,
            result_of_stop: "Arrest".to_string(),
            cmpd_division: Some("South Division".to_string()),
            outcome: Outcome::Arrest,
            arrest: ArrestLabel::Arrest,
            racial_match: 0,
        };
        let table = LabeledTable::from_records(&[record], Target::SearchConducted);
        let row = &table.rows[0];
        assert_eq!(row.categorical(columns::CMPD_DIVISION), Some("South Division"));
        assert_eq!(row.continuous(columns::DRIVER_AGE), Some(40.0));
        assert_eq!(row.flag(columns::OFFICER_GENDER), 1.0);
        assert_eq!(row.categorical(columns::DRIVER_AGE), None);
        assert_eq!(table.class_counts(), [0, 1]);
    }
}
