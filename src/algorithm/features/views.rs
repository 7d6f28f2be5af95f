//! The two feature views the classifiers are trained on.
//!
//! The normal view keeps race and gender (driver race collapsed to
//! White/non-White). The contrast view drops every race and gender column
//! and keeps only whether officer and driver gender match. One-hot
//! categories are fitted on the training table and reused for the test table.

use std::collections::BTreeSet;
use std::fmt;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::algorithm::features::matrix::FeatureMatrix;
use crate::algorithm::features::table::{LabeledTable, MISSING_CATEGORY, StopFeatures};
use crate::error::{Result, StopAnalysisError};
use crate::models::columns;

/// Which feature view to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    Normal,
    Contrast,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Contrast => f.write_str("contrast"),
        }
    }
}

/// Driver race as White (0) or non-White (1)
#[must_use]
pub fn driver_race_code(race: &str) -> Option<f64> {
    match race {
        "White" => Some(0.0),
        "Black" | "Asian" | "Native American" | "Other/Unknown" => Some(1.0),
        _ => None,
    }
}

/// Categories of one column, fitted on the training table
#[derive(Debug, Clone, PartialEq)]
pub struct OneHot {
    pub column: &'static str,
    pub categories: Vec<String>,
}

impl OneHot {
    fn fit(column: &'static str, rows: &[StopFeatures]) -> Self {
        let categories: BTreeSet<&str> = rows
            .iter()
            .filter_map(|r| r.categorical(column))
            .map(str::trim)
            .filter(|v| *v != MISSING_CATEGORY)
            .collect();
        Self {
            column,
            categories: categories.into_iter().map(ToString::to_string).collect(),
        }
    }

    fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(move |c| format!("{}_{c}", self.column))
    }

    /// Indicator values for one row; unseen categories give all zeros
    fn encode(&self, row: &StopFeatures, out: &mut Vec<f64>) {
        let value = row.categorical(self.column).map(str::trim);
        out.extend(
            self.categories
                .iter()
                .map(|c| if value == Some(c.as_str()) { 1.0 } else { 0.0 }),
        );
    }
}

/// A fitted feature view
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureView {
    pub kind: ViewKind,
    one_hot: Vec<OneHot>,
}

impl FeatureView {
    /// Fit one-hot categories on the training table
    #[must_use]
    pub fn fit(kind: ViewKind, train: &LabeledTable) -> Self {
        let encoded: &[&'static str] = match kind {
            ViewKind::Normal => &[
                columns::REASON_FOR_STOP,
                columns::CMPD_DIVISION,
                columns::OFFICER_RACE,
            ],
            ViewKind::Contrast => &[columns::REASON_FOR_STOP, columns::CMPD_DIVISION],
        };
        Self {
            kind,
            one_hot: encoded
                .iter()
                .map(|&column| OneHot::fit(column, &train.rows))
                .collect(),
        }
    }

    fn leading_columns(&self) -> &'static [&'static str] {
        match self.kind {
            ViewKind::Normal => &[
                columns::OFFICER_GENDER,
                columns::OFFICER_YEARS_OF_SERVICE,
                columns::DRIVER_RACE,
                columns::DRIVER_ETHNICITY,
                columns::DRIVER_GENDER,
                columns::DRIVER_AGE,
            ],
            ViewKind::Contrast => &[
                columns::OFFICER_YEARS_OF_SERVICE,
                columns::DRIVER_ETHNICITY,
                columns::DRIVER_AGE,
            ],
        }
    }

    /// Output column names, in matrix order
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .leading_columns()
            .iter()
            .map(ToString::to_string)
            .collect();
        for encoder in &self.one_hot {
            names.extend(encoder.names());
        }
        if self.kind == ViewKind::Contrast {
            names.push(columns::GENDER_MATCH.to_string());
        }
        names
    }

    fn leading_value(column: &str, row: &StopFeatures) -> Result<f64> {
        if column == columns::DRIVER_RACE {
            let race = row.categorical(column).unwrap_or_default();
            return driver_race_code(race).ok_or_else(|| {
                StopAnalysisError::SchemaMismatch(format!("no race code for Driver_Race '{race}'"))
            });
        }
        Ok(row
            .continuous(column)
            .unwrap_or_else(|| row.flag(column)))
    }

    fn encode_row(&self, row: &StopFeatures, out: &mut Vec<f64>) -> Result<()> {
        for column in self.leading_columns() {
            out.push(Self::leading_value(column, row)?);
        }
        for encoder in &self.one_hot {
            encoder.encode(row, out);
        }
        if self.kind == ViewKind::Contrast {
            let matched = row.categorical(columns::OFFICER_GENDER)
                == row.categorical(columns::DRIVER_GENDER);
            out.push(if matched { 1.0 } else { 0.0 });
        }
        Ok(())
    }

    /// Encode a table into (features, target)
    pub fn transform(&self, table: &LabeledTable) -> Result<(FeatureMatrix, Array1<usize>)> {
        let names = self.feature_names();
        let mut values = Vec::with_capacity(table.len() * names.len());
        for row in &table.rows {
            self.encode_row(row, &mut values)?;
        }
        let matrix = Array2::from_shape_vec((table.len(), names.len()), values).map_err(|e| {
            StopAnalysisError::SchemaMismatch(format!("feature matrix shape: {e}"))
        })?;
        Ok((
            FeatureMatrix::new(names, matrix)?,
            Array1::from(table.labels.clone()),
        ))
    }
}

/// Fit a view on `train` and encode both tables with it
pub fn build_view(
    kind: ViewKind,
    train: &LabeledTable,
    test: &LabeledTable,
) -> Result<ViewData> {
    let view = FeatureView::fit(kind, train);
    let (x_train, t_train) = view.transform(train)?;
    let (x_test, t_test) = view.transform(test)?;
    Ok(ViewData {
        kind,
        x_train,
        t_train,
        x_test,
        t_test,
    })
}

/// Train and test matrices of one view
#[derive(Debug, Clone)]
pub struct ViewData {
    pub kind: ViewKind,
    pub x_train: FeatureMatrix,
    pub t_train: Array1<usize>,
    pub x_test: FeatureMatrix,
    pub t_test: Array1<usize>,
}

impl ViewData {
    /// The same split with the named columns removed from both matrices
    #[must_use]
    pub fn without(&self, names: &[impl AsRef<str>]) -> Self {
        Self {
            kind: self.kind,
            x_train: self.x_train.drop(names),
            t_train: self.t_train.clone(),
            x_test: self.x_test.drop(names),
            t_test: self.t_test.clone(),
        }
    }

    /// The same split restricted to the named columns
    pub fn only(&self, names: &[impl AsRef<str>]) -> Result<Self> {
        Ok(Self {
            kind: self.kind,
            x_train: self.x_train.select(names)?,
            t_train: self.t_train.clone(),
            x_test: self.x_test.select(names)?,
            t_test: self.t_test.clone(),
        })
    }
}
