//! Stratified k-fold cross-validation.

use std::fmt;

use ndarray::{Array1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithm::classify::{Classifier, ModelSpec};
use crate::algorithm::evaluation::fairness::p_percent_score;
use crate::algorithm::evaluation::metrics::{accuracy, recall};
use crate::algorithm::features::FeatureMatrix;
use crate::error::{Result, StopAnalysisError};

/// Unshuffled stratified folds
///
/// Rows of each class go to folds in contiguous runs, and the per-fold
/// class counts differ by at most one, so the folds only depend on the
/// label sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedKFold {
    test_folds: Vec<usize>,
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(y: &Array1<usize>, n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(StopAnalysisError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {n_splits}"
            )));
        }
        if n_splits > y.len() {
            return Err(StopAnalysisError::model(format!(
                "cannot split {} rows into {n_splits} folds",
                y.len()
            )));
        }

        // Classes numbered by first appearance
        let mut classes: Vec<usize> = Vec::new();
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| match classes.iter().position(|c| c == label) {
                Some(i) => i,
                None => {
                    classes.push(*label);
                    classes.len() - 1
                }
            })
            .collect();

        let mut sorted = encoded.clone();
        sorted.sort_unstable();
        // allocation[fold][class]: rows of `class` tested in `fold`
        let mut allocation = vec![vec![0usize; classes.len()]; n_splits];
        for (i, &class) in sorted.iter().enumerate() {
            allocation[i % n_splits][class] += 1;
        }

        let mut test_folds = vec![0; y.len()];
        for class in 0..classes.len() {
            let mut assignments = allocation
                .iter()
                .enumerate()
                .flat_map(|(fold, counts)| std::iter::repeat_n(fold, counts[class]));
            for (row, _) in encoded.iter().enumerate().filter(|&(_, &c)| c == class) {
                test_folds[row] = assignments.next().unwrap_or(0);
            }
        }

        Ok(Self {
            test_folds,
            n_splits,
        })
    }

    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// (train rows, test rows) of every fold, in fold order
    #[must_use]
    pub fn splits(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        (0..self.n_splits)
            .map(|fold| -> (Vec<usize>, Vec<usize>) {
                (0..self.test_folds.len()).partition(|&row| self.test_folds[row] != fold)
            })
            .collect()
    }
}

/// What a cross-validation fold is scored by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Recall of class 1
    Recall,
    Accuracy,
    /// p% score of the predictions with respect to a 0/1 column
    PPercent(String),
}

impl Scorer {
    /// Score a fitted model on held-out rows
    pub fn score(
        &self,
        model: &dyn Classifier,
        x: &FeatureMatrix,
        y: &Array1<usize>,
    ) -> Result<f64> {
        match self {
            Self::Recall => Ok(recall(y, &model.predict(x)?)),
            Self::Accuracy => Ok(accuracy(y, &model.predict(x)?)),
            Self::PPercent(column) => p_percent_score(model, x, column),
        }
    }
}

impl fmt::Display for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recall => f.write_str("recall"),
            Self::Accuracy => f.write_str("accuracy"),
            Self::PPercent(column) => write!(f, "p%({column})"),
        }
    }
}

/// Fit a fresh model per fold and score it with every scorer
///
/// # Arguments
///
/// * `spec` - Model rebuilt from scratch for each fold
/// * `folds` - Fold assignment for the rows of `x`
/// * `scorers` - Result row `i` holds the per-fold scores of `scorers[i]`
pub fn cross_validate(
    spec: &ModelSpec,
    x: &FeatureMatrix,
    y: &Array1<usize>,
    folds: &StratifiedKFold,
    scorers: &[Scorer],
) -> Result<Vec<Vec<f64>>> {
    let per_fold: Vec<Vec<f64>> = folds
        .splits()
        .into_par_iter()
        .map(|(train, test)| {
            let mut model = spec.build();
            model.check_compatible(x)?;
            model.fit(&x.select_rows(&train), &y.select(Axis(0), &train))?;
            let x_test = x.select_rows(&test);
            let y_test = y.select(Axis(0), &test);
            scorers
                .iter()
                .map(|s| s.score(model.as_ref(), &x_test, &y_test))
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    Ok((0..scorers.len())
        .map(|i| per_fold.iter().map(|fold| fold[i]).collect())
        .collect())
}

/// Per-fold scores of one scorer
pub fn cross_val_score(
    spec: &ModelSpec,
    x: &FeatureMatrix,
    y: &Array1<usize>,
    folds: &StratifiedKFold,
    scorer: &Scorer,
) -> Result<Vec<f64>> {
    let mut scores = cross_validate(spec, x, y, folds, std::slice::from_ref(scorer))?;
    Ok(scores.pop().unwrap_or_default())
}

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
