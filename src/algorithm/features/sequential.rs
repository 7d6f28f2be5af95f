//! Greedy forward feature selection by cross-validated score.

use log::{debug, info};
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithm::classify::ModelSpec;
use crate::algorithm::evaluation::cv::{Scorer, StratifiedKFold, cross_val_score, mean};
use crate::algorithm::features::matrix::FeatureMatrix;
use crate::algorithm::features::scaling::MinMaxScaler;
use crate::error::{Result, StopAnalysisError};

/// The column added at one step and the score it reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionStep {
    pub added: String,
    pub cv_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialSelection {
    /// Selected columns in their original order
    pub selected: Vec<String>,
    pub steps: Vec<SelectionStep>,
}

/// Number of columns a fraction of `n` selects, at least one
#[must_use]
pub fn target_count(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).floor() as usize).clamp(1, n.max(1))
}

/// Add columns one at a time, each time the one with the best mean CV score
///
/// Features are min-max scaled first. Ties go to the earlier column.
///
/// # Arguments
///
/// * `spec` - Unfitted model refit for every candidate set and fold
/// * `fraction` - Share of the columns to select
pub fn forward_select(
    spec: &ModelSpec,
    x: &FeatureMatrix,
    y: &Array1<usize>,
    fraction: f64,
    cv_folds: usize,
    scorer: &Scorer,
) -> Result<SequentialSelection> {
    if x.ncols() == 0 {
        return Err(StopAnalysisError::model("forward selection needs at least one column"));
    }
    let scaled = FeatureMatrix::new(x.names().to_vec(), MinMaxScaler::fit_transform(x.values()))?;
    let folds = StratifiedKFold::new(y, cv_folds)?;
    let wanted = target_count(x.ncols(), fraction);
    info!(
        "Forward selection of {wanted} out of {} columns by {scorer}",
        x.ncols()
    );

    let mut chosen: Vec<usize> = Vec::with_capacity(wanted);
    let mut steps = Vec::with_capacity(wanted);
    while chosen.len() < wanted {
        let remaining: Vec<usize> = (0..x.ncols()).filter(|i| !chosen.contains(i)).collect();
        let scores: Vec<f64> = remaining
            .par_iter()
            .map(|&candidate| {
                let mut columns = chosen.clone();
                columns.push(candidate);
                columns.sort_unstable();
                let subset = scaled.select_indices(&columns);
                cross_val_score(spec, &subset, y, &folds, scorer).map(|s| mean(&s))
            })
            .collect::<Result<_>>()?;

        let (best_pos, best_score) = scores
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bp, bs), (p, &s)| {
                if s > bs { (p, s) } else { (bp, bs) }
            });
        let added = remaining[best_pos];
        debug!("Selected {} (cv {:.4})", x.names()[added], best_score);
        chosen.push(added);
        steps.push(SelectionStep {
            added: x.names()[added].clone(),
            cv_score: best_score,
        });
    }

    chosen.sort_unstable();
    Ok(SequentialSelection {
        selected: chosen.iter().map(|&i| x.names()[i].clone()).collect(),
        steps,
    })
}
