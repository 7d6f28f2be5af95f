//! Configuration for the cleaning and modeling stages.
//!
//! Every struct has a `Default` matching the values the analysis was run
//! with, and all of them deserialize from a (partial) JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::util::safe_open_file;
use crate::error::{Result, StopAnalysisError};

/// Top-level configuration for both pipeline stages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ingestion, validation, cleaning and export
    pub cleaning: CleaningConfig,
    /// Upsampling, feature views, classifier panel and searches
    pub modeling: ModelingConfig,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; missing keys fall back to defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = safe_open_file(path, "pipeline configuration")?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject value combinations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let c = &self.cleaning;
        if !(0.0..1.0).contains(&c.test_fraction) || c.test_fraction == 0.0 {
            return Err(StopAnalysisError::InvalidConfig(format!(
                "test_fraction must be in (0, 1), got {}",
                c.test_fraction
            )));
        }
        if c.month_formats.is_empty() {
            return Err(StopAnalysisError::InvalidConfig(
                "at least one month format is required".to_string(),
            ));
        }

        let m = &self.modeling;
        if m.cv_folds < 2 {
            return Err(StopAnalysisError::InvalidConfig(format!(
                "cv_folds must be at least 2, got {}",
                m.cv_folds
            )));
        }
        if !(0.0..=1.0).contains(&m.sfs_fraction) || m.sfs_fraction == 0.0 {
            return Err(StopAnalysisError::InvalidConfig(format!(
                "sfs_fraction must be in (0, 1], got {}",
                m.sfs_fraction
            )));
        }
        if m.k_neighbors == 0 || m.smote_neighbors == 0 {
            return Err(StopAnalysisError::InvalidConfig(
                "neighbour counts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output file format for exported partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    /// File extension without the dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

/// Configuration for stage 1 (ingestion and cleaning)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// The current (2020-21) extract
    pub current_extract: PathBuf,
    /// The 2016-17 extract
    pub legacy_extract: PathBuf,
    /// Directory partitions and reports are written to
    pub output_dir: PathBuf,
    /// Identifier/audit columns only present in the current extract
    pub current_drop_columns: Vec<String>,
    /// Identifier/audit columns only present in the legacy extract
    pub legacy_drop_columns: Vec<String>,
    /// Allowed values per categorical column
    pub allow_lists: AllowLists,
    /// Abort when the validation report flags anything
    pub strict_validation: bool,
    /// Formats tried in order when parsing `Month_of_Stop`
    pub month_formats: Vec<String>,
    /// Drivers younger than this are considered implausible
    pub min_driver_age: f64,
    /// Whether implausible-age rows are removed after the diagnostic
    pub drop_underage: bool,
    /// Stops before this month belong to the earlier era
    pub era_threshold: NaiveDate,
    /// Share of the modeling partition held out for testing
    pub test_fraction: f64,
    /// Seed for the train/test shuffle
    pub split_seed: u64,
    /// Format of exported partitions
    pub export_format: ExportFormat,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            current_extract: PathBuf::from("Raw_Data/Officer_Traffic_Stops.csv"),
            legacy_extract: PathBuf::from("Raw_Data/Officer_Traffic_Stops_2016-17.csv"),
            output_dir: PathBuf::from("Processed_Data"),
            current_drop_columns: vec!["OBJECTID".to_string(), "GlobalID".to_string()],
            legacy_drop_columns: ["ObjectID", "CreationDate", "Creator", "EditDate", "Editor"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            allow_lists: AllowLists::default(),
            strict_validation: true,
            month_formats: vec![
                "%Y/%m".to_string(),
                "%Y-%m".to_string(),
                "%Y-%m-%d".to_string(),
                "%m/%d/%Y".to_string(),
            ],
            min_driver_age: 15.0,
            drop_underage: true,
            era_threshold: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            test_fraction: 0.25,
            split_seed: 101,
            export_format: ExportFormat::Csv,
        }
    }
}

/// Allowed values for each categorical column of the raw extracts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowLists {
    /// Column name -> allowed values
    pub columns: BTreeMap<String, Vec<String>>,
    /// Columns where a missing value is acceptable
    pub nullable: Vec<String>,
    /// Columns where a value is accepted when it contains an allowed text
    pub substring_match: Vec<String>,
}

impl AllowLists {
    /// Allowed values for a column, if it is allow-listed
    #[must_use]
    pub fn allowed(&self, column: &str) -> Option<&[String]> {
        self.columns.get(column).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_nullable(&self, column: &str) -> bool {
        self.nullable.iter().any(|c| c == column)
    }

    /// Whether `value` is acceptable for `column`. Columns not allow-listed accept anything.
    #[must_use]
    pub fn accepts(&self, column: &str, value: &str) -> bool {
        let Some(allowed) = self.allowed(column) else {
            return true;
        };
        if self.substring_match.iter().any(|c| c == column) {
            allowed.iter().any(|a| value.contains(a.as_str()))
        } else {
            allowed.iter().any(|a| a == value)
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl Default for AllowLists {
    fn default() -> Self {
        let mut columns = BTreeMap::new();
        columns.insert(
            "Reason_for_Stop".to_string(),
            owned(&[
                "CheckPoint",
                "Driving While Impaired",
                "Investigation",
                "Other",
                "Safe Movement",
                "SeatBelt",
                "Speeding",
                "Stop Light/Sign",
                "Vehicle Equipment",
                "Vehicle Regulatory",
            ]),
        );
        columns.insert(
            "Officer_Race".to_string(),
            owned(&[
                "2 or More",
                "American Indian/Alaska Native",
                "Asian / Pacific Islander",
                "Black/African American",
                "Hispanic/Latino",
                "Not Specified",
                "White",
            ]),
        );
        columns.insert("Officer_Gender".to_string(), owned(&["Female", "Male"]));
        columns.insert(
            "Driver_Race".to_string(),
            owned(&["Asian", "Black", "Native American", "Other/Unknown", "White"]),
        );
        columns.insert(
            "Driver_Ethnicity".to_string(),
            owned(&["Hispanic", "Non-Hispanic"]),
        );
        columns.insert("Driver_Gender".to_string(), owned(&["Female", "Male"]));
        columns.insert("Was_a_Search_Conducted".to_string(), owned(&["No", "Yes"]));
        columns.insert(
            "Result_of_Stop".to_string(),
            owned(&[
                "Arrest",
                "Citation Issued",
                "No Action Taken",
                "Verbal Warning",
                "Written Warning",
            ]),
        );
        columns.insert(
            "CMPD_Division".to_string(),
            owned(&[
                "Central Division",
                "Eastway Division",
                "Freedom Division",
                "Hickory Grove Division",
                "Independence Division",
                "Metro Division",
                "North Division",
                "North Tryon Division",
                "Providence Division",
                "South Division",
                "Steele Creek Division",
                "University City Division",
                "Westover Division",
            ]),
        );

        Self {
            columns,
            nullable: vec!["CMPD_Division".to_string()],
            // "Arrest for DWI" and "Citation Issued - Speeding" collapse like their base texts
            substring_match: vec!["Result_of_Stop".to_string()],
        }
    }
}

/// How the univariate filter turns scores into a column selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "k")]
pub enum UnivariateCut {
    /// Drop the k lowest-scoring columns
    DropLowest(usize),
    /// Keep only the k highest-scoring columns
    KeepTop(usize),
    /// Keep everything (scores are only reported)
    All,
}

/// Configuration for stage 2 (feature engineering and modeling)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelingConfig {
    /// Exported training partition
    pub train_path: PathBuf,
    /// Exported test partition
    pub test_path: PathBuf,
    /// Directory for panel/search/sweep results
    pub output_dir: PathBuf,
    /// `Was_a_Search_Conducted` or `Arrest`
    pub target: String,
    /// Rebalance the training set before building feature views
    pub upsample: bool,
    /// Neighbours used by SMOTE-NC
    pub smote_neighbors: usize,
    /// Seed for SMOTE-NC
    pub smote_seed: u64,
    /// Base seed for models with randomness (forests, CV shuffles)
    pub model_seed: u64,
    /// Sensitive column used by the fairness classifier and p% score
    pub sensitive_column: String,
    /// Covariance threshold of the panel's fairness classifier
    pub covariance_threshold: f64,
    /// Iteration cap for logistic regression
    pub logistic_max_iter: usize,
    /// Neighbours used by the k-NN classifier
    pub k_neighbors: usize,
    /// Folds for every cross-validated step
    pub cv_folds: usize,
    /// Columns dropped by the manual feature-selection variant
    pub manual_drop_columns: Vec<String>,
    /// Cut applied to chi-squared and mutual-information scores
    pub univariate_cut: UnivariateCut,
    /// Equal-frequency bins for continuous columns in mutual information
    pub mutual_info_bins: usize,
    /// Fraction of columns kept by sequential forward selection
    pub sfs_fraction: f64,
    /// Candidates drawn by randomized search
    pub random_search_iter: usize,
    /// Seed for randomized search
    pub search_seed: u64,
    /// Covariance thresholds visited by the fairness sweep
    pub sweep_thresholds: Vec<f64>,
    /// Run the panel on the contrast view
    pub run_contrast: bool,
    /// Run the panel with `Driver_Race` removed
    pub run_race_ablation: bool,
    /// Run the manual, chi-squared and mutual-information variants
    pub run_feature_selection: bool,
    /// Run sequential forward selection
    pub run_sequential_selection: bool,
    /// Run the exhaustive grid search
    pub run_grid_search: bool,
    /// Run the randomized search
    pub run_random_search: bool,
    /// Sweep the fairness classifier's covariance threshold
    pub run_fairness_sweep: bool,
    /// Worker threads for rayon; 0 means one per CPU
    pub threads: usize,
}

/// `n` evenly spaced values from `start` to `end` inclusive
#[must_use]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

impl Default for ModelingConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("Processed_Data/stops_2020_train.csv"),
            test_path: PathBuf::from("Processed_Data/stops_2020_test.csv"),
            output_dir: PathBuf::from("Model_Results"),
            target: "Was_a_Search_Conducted".to_string(),
            upsample: true,
            smote_neighbors: 5,
            smote_seed: 42,
            model_seed: 0,
            sensitive_column: "Driver_Race".to_string(),
            covariance_threshold: 0.80,
            logistic_max_iter: 500,
            k_neighbors: 5,
            cv_folds: 3,
            manual_drop_columns: vec![
                "Officer_Gender".to_string(),
                "Officer_Years_of_Service".to_string(),
                "Driver_Age".to_string(),
            ],
            univariate_cut: UnivariateCut::DropLowest(7),
            mutual_info_bins: 10,
            sfs_fraction: 0.8,
            random_search_iter: 25,
            search_seed: 7,
            sweep_thresholds: linspace(0.01, 1.0, 10),
            run_contrast: true,
            run_race_ablation: true,
            run_feature_selection: true,
            run_sequential_selection: true,
            run_grid_search: true,
            run_random_search: true,
            run_fairness_sweep: true,
            threads: 0,
        }
    }
}
