//! Fairness scores and the covariance-threshold sweep.

use std::fmt;
use std::path::Path;

use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use log::info;
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::algorithm::classify::{Classifier, LogisticRegression, ModelSpec, Penalty};
use crate::algorithm::evaluation::cv::{StratifiedKFold, Scorer, cross_validate, mean};
use crate::algorithm::evaluation::metrics::{accuracy, recall};
use crate::algorithm::features::FeatureMatrix;
use crate::error::{Result, StopAnalysisError};
use crate::utils::io::csv::write_csv;
use crate::utils::logging::{finish_fit_progress, fit_progress_bar};

/// Rates of positive predictions in the two groups of a 0/1 column
fn positive_rates(
    model: &dyn Classifier,
    x: &FeatureMatrix,
    sensitive_column: &str,
) -> Result<(Option<f64>, Option<f64>)> {
    let sensitive = x
        .column(sensitive_column)
        .ok_or_else(|| StopAnalysisError::IncompatibleFeatures {
            model: model.name(),
            column: sensitive_column.to_string(),
        })?;
    if sensitive.iter().any(|&v| v != 0.0 && v != 1.0) {
        return Err(StopAnalysisError::model(format!(
            "p% score needs a 0/1 column, {sensitive_column} has other values"
        )));
    }
    let predicted = model.predict(x)?;

    let rate = |group: f64| {
        let (members, positives) = sensitive
            .iter()
            .zip(predicted.iter())
            .filter(|&(&s, _)| s == group)
            .fold((0usize, 0usize), |(m, p), (_, &y)| (m + 1, p + usize::from(y == 1)));
        (members > 0).then(|| positives as f64 / members as f64)
    };
    Ok((rate(0.0), rate(1.0)))
}

/// p% score: the smaller ratio of positive-prediction rates between groups
///
/// 0 when either group never gets a positive prediction, 1 when a group
/// is absent from `x`.
pub fn p_percent_score(model: &dyn Classifier, x: &FeatureMatrix, sensitive_column: &str) -> Result<f64> {
    Ok(match positive_rates(model, x, sensitive_column)? {
        (Some(r0), Some(r1)) if r0 == 0.0 || r1 == 0.0 => 0.0,
        (Some(r0), Some(r1)) => (r1 / r0).min(r0 / r1),
        _ => 1.0,
    })
}

/// Absolute gap between the groups' positive-prediction rates
pub fn demographic_parity_difference(
    model: &dyn Classifier,
    x: &FeatureMatrix,
    sensitive_column: &str,
) -> Result<f64> {
    Ok(match positive_rates(model, x, sensitive_column)? {
        (Some(r0), Some(r1)) => (r1 - r0).abs(),
        _ => 0.0,
    })
}

/// Cross-validated scores at one covariance threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub threshold: f64,
    pub p_percent: f64,
    pub accuracy: f64,
    pub recall: f64,
}

/// Unconstrained logistic regression scored on its own training set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub p_percent: f64,
    pub accuracy: f64,
    pub recall: f64,
}

/// One CSV row of the sweep; the reference row has no threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub series: String,
    pub threshold: Option<f64>,
    pub p_percent: f64,
    pub accuracy: f64,
    pub recall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessSweep {
    pub sensitive_column: String,
    pub points: Vec<SweepPoint>,
    pub reference: ReferencePoint,
}

impl FairnessSweep {
    #[must_use]
    pub fn rows(&self) -> Vec<SweepRow> {
        let mut rows: Vec<SweepRow> = self
            .points
            .iter()
            .map(|p| SweepRow {
                series: "demographic_parity".to_string(),
                threshold: Some(p.threshold),
                p_percent: p.p_percent,
                accuracy: p.accuracy,
                recall: p.recall,
            })
            .collect();
        rows.push(SweepRow {
            series: "logistic_reference".to_string(),
            threshold: None,
            p_percent: self.reference.p_percent,
            accuracy: self.reference.accuracy,
            recall: self.reference.recall,
        });
        rows
    }

    pub fn to_batch(&self) -> Result<RecordBatch> {
        let fields = Vec::<FieldRef>::from_type::<SweepRow>(TracingOptions::default())?;
        Ok(serde_arrow::to_record_batch(&fields, &self.rows())?)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        write_csv(path, &self.to_batch()?)
    }
}

impl fmt::Display for FairnessSweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>10} {:>10} {:>10} {:>10}",
            "threshold", "p%", "accuracy", "recall"
        )?;
        for p in &self.points {
            writeln!(
                f,
                "{:>10.2} {:>10.4} {:>10.4} {:>10.4}",
                p.threshold, p.p_percent, p.accuracy, p.recall
            )?;
        }
        writeln!(
            f,
            "{:>10} {:>10.4} {:>10.4} {:>10.4}",
            "LR", self.reference.p_percent, self.reference.accuracy, self.reference.recall
        )
    }
}

/// Fit the demographic-parity classifier across covariance thresholds
///
/// # Arguments
///
/// * `x` - Training features, including `sensitive_column`
/// * `thresholds` - Covariance thresholds to visit, in output order
/// * `folds` - Folds every threshold is cross-validated on
pub fn fairness_sweep(
    x: &FeatureMatrix,
    y: &Array1<usize>,
    sensitive_column: &str,
    thresholds: &[f64],
    max_iter: usize,
    folds: &StratifiedKFold,
) -> Result<FairnessSweep> {
    let scorers = [
        Scorer::PPercent(sensitive_column.to_string()),
        Scorer::Accuracy,
        Scorer::Recall,
    ];
    let pb = fit_progress_bar(
        (thresholds.len() * folds.n_splits()) as u64,
        "fairness sweep",
    );
    let points = thresholds
        .par_iter()
        .map(|&threshold| {
            let spec = ModelSpec::DemographicParity {
                sensitive_column: sensitive_column.to_string(),
                covariance_threshold: threshold,
                max_iter,
            };
            let scores = cross_validate(&spec, x, y, folds, &scorers)?;
            pb.inc(folds.n_splits() as u64);
            Ok(SweepPoint {
                threshold,
                p_percent: mean(&scores[0]),
                accuracy: mean(&scores[1]),
                recall: mean(&scores[2]),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    finish_fit_progress(&pb, &format!("{} thresholds", points.len()));

    let mut reference_model = LogisticRegression::new(Penalty::L2, max_iter);
    reference_model.fit(x, y)?;
    let predicted = reference_model.predict(x)?;
    let reference = ReferencePoint {
        p_percent: p_percent_score(&reference_model, x, sensitive_column)?,
        accuracy: accuracy(y, &predicted),
        recall: recall(y, &predicted),
    };
    info!(
        "Logistic reference: p% {:.4}, accuracy {:.4}, recall {:.4}",
        reference.p_percent, reference.accuracy, reference.recall
    );

    Ok(FairnessSweep {
        sensitive_column: sensitive_column.to_string(),
        points,
        reference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Predicts the value of column `flag` as the class
    #[derive(Debug)]
    struct Echo;

    impl Classifier for Echo {
        fn spec(&self) -> ModelSpec {
            ModelSpec::KNearestNeighbors { k: 1 }
        }
        fn fit(&mut self, _x: &FeatureMatrix, _y: &Array1<usize>) -> Result<()> {
            Ok(())
        }
        fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
            Ok(x.column("flag").unwrap_or_else(|| Array1::zeros(x.nrows())))
        }
    }

    fn matrix(race: &[f64], flag: &[f64]) -> FeatureMatrix {
        let mut values = ndarray::Array2::zeros((race.len(), 2));
        for i in 0..race.len() {
            values[[i, 0]] = race[i];
            values[[i, 1]] = flag[i];
        }
        FeatureMatrix::new(vec!["race".into(), "flag".into()], values).unwrap()
    }

    #[test]
    fn test_p_percent_ratio() {
        // group 0: 1/2 positive, group 1: 1/4 positive
        let x = matrix(&[0.0, 0.0, 1.0, 1.0, 1.0, 1.0], &[1.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        assert!((p_percent_score(&Echo, &x, "race").unwrap() - 0.5).abs() < 1e-12);
        assert!((demographic_parity_difference(&Echo, &x, "race").unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_p_percent_zero_when_group_never_positive() {
        let x = matrix(&[0.0, 0.0, 1.0, 1.0], &[1.0, 1.0, 0.0, 0.0]);
        assert_eq!(p_percent_score(&Echo, &x, "race").unwrap(), 0.0);
    }

    #[test]
    fn test_p_percent_rejects_non_binary_column() {
        let x = matrix(&[0.0, 2.0], &[1.0, 0.0]);
        assert!(p_percent_score(&Echo, &x, "race").is_err());
        assert!(p_percent_score(&Echo, &x, "missing").is_err());
    }

    #[test]
    fn test_sweep_rows_end_with_reference() {
        let sweep = FairnessSweep {
            sensitive_column: "race".into(),
            points: vec![SweepPoint {
                threshold: 0.01,
                p_percent: 0.9,
                accuracy: 0.7,
                recall: 0.6,
            }],
            reference: ReferencePoint {
                p_percent: 0.5,
                accuracy: 0.8,
                recall: 0.7,
            },
        };
        let rows = sweep.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].threshold, None);
        let batch = sweep.to_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 5);
    }

    #[test]
    fn test_sweep_scores_every_threshold() {
        let race = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let signal = [0.0, 0.2, 0.4, 3.0, 3.2, 3.4, 0.1, 0.3, 0.5, 3.1, 3.3, 3.5];
        let mut values = ndarray::Array2::zeros((12, 2));
        for i in 0..12 {
            values[[i, 0]] = race[i];
            values[[i, 1]] = signal[i];
        }
        let x = FeatureMatrix::new(vec!["race".into(), "signal".into()], values).unwrap();
        let y = array![0, 0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 1];
        let folds = StratifiedKFold::new(&y, 3).unwrap();

        let sweep = fairness_sweep(&x, &y, "race", &[0.01, 1.0], 200, &folds).unwrap();
        assert_eq!(sweep.points.len(), 2);
        assert_eq!(sweep.points[0].threshold, 0.01);
        for p in &sweep.points {
            assert!((0.0..=1.0).contains(&p.p_percent));
            assert!((0.0..=1.0).contains(&p.recall));
        }
        assert!(sweep.reference.accuracy > 0.9);
    }
}
