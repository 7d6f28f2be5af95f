//! Grid and randomized hyperparameter search across model families.
//!
//! Candidates from every family compete in one search; the best mean
//! cross-validated score wins (earliest candidate on ties), is refit on the
//! whole training set and scored on the test set.

use std::fmt;

use log::{info, warn};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithm::classify::{MaxFeatures, ModelSpec, Penalty};
use crate::algorithm::evaluation::cv::{Scorer, StratifiedKFold, cross_val_score, mean};
use crate::algorithm::evaluation::metrics::ConfusionMatrix;
use crate::algorithm::evaluation::panel::evaluate;
use crate::algorithm::features::ViewData;
use crate::config::{ModelingConfig, linspace};
use crate::error::{Result, StopAnalysisError};
use crate::utils::logging::{finish_fit_progress, fit_progress_bar, log_block};

pub const LEARNING_RATES: [f64; 6] = [0.15, 0.1, 0.05, 0.01, 0.005, 0.001];
pub const BOOSTING_ROUNDS: [usize; 5] = [5, 10, 25, 50, 75];
pub const BOOSTING_DEPTH: usize = 3;

/// `n` values from `10^start` to `10^end`, evenly spaced in the exponent
#[must_use]
pub fn logspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    linspace(start, end, n)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect()
}

/// Every candidate of the grid, family by family
#[must_use]
pub fn grid_candidates(config: &ModelingConfig) -> Vec<ModelSpec> {
    let mut candidates: Vec<ModelSpec> = [Penalty::ElasticNet, Penalty::L2]
        .into_iter()
        .map(|penalty| ModelSpec::LogisticRegression {
            penalty,
            max_iter: config.logistic_max_iter,
        })
        .collect();

    for learning_rate in LEARNING_RATES {
        for n_estimators in BOOSTING_ROUNDS {
            candidates.push(ModelSpec::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth: BOOSTING_DEPTH,
            });
        }
    }

    for n_estimators in (40..=90).step_by(10) {
        for max_features in 1..=4 {
            for max_depth in 3..=5 {
                candidates.push(ModelSpec::RandomForest {
                    n_estimators,
                    max_features: MaxFeatures::Count(max_features),
                    max_depth: Some(max_depth),
                    seed: config.model_seed,
                });
            }
        }
    }

    candidates.extend(
        logspace(0.0, -9.0, 100)
            .into_iter()
            .map(|var_smoothing| ModelSpec::GaussianNb { var_smoothing }),
    );
    candidates
}

/// `n_iter` candidates drawn from the grid's ranges
///
/// A family is picked uniformly, then its parameters: learning rate uniform
/// over the grid's span, integer parameters uniform over their ranges,
/// `var_smoothing` log-uniform.
#[must_use]
pub fn random_candidates(config: &ModelingConfig, n_iter: usize, seed: u64) -> Vec<ModelSpec> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_iter)
        .map(|_| match rng.random_range(0..4) {
            0 => ModelSpec::LogisticRegression {
                penalty: if rng.random::<bool>() {
                    Penalty::ElasticNet
                } else {
                    Penalty::L2
                },
                max_iter: config.logistic_max_iter,
            },
            1 => ModelSpec::GradientBoosting {
                n_estimators: rng.random_range(5..=75),
                learning_rate: rng.random_range(0.001..=0.15),
                max_depth: BOOSTING_DEPTH,
            },
            2 => ModelSpec::RandomForest {
                n_estimators: rng.random_range(40..=90),
                max_features: MaxFeatures::Count(rng.random_range(1..=4)),
                max_depth: Some(rng.random_range(3..=5)),
                seed: config.model_seed,
            },
            _ => ModelSpec::GaussianNb {
                var_smoothing: 10f64.powf(rng.random_range(-9.0..=0.0)),
            },
        })
        .collect()
}

/// Mean and per-fold scores of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub spec: ModelSpec,
    pub mean_score: f64,
    pub fold_scores: Vec<f64>,
}

/// Outcome of one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub search: String,
    pub scorer: Scorer,
    pub candidates: Vec<CandidateScore>,
    /// Candidates whose cross-validation raised an error
    pub failed: usize,
    pub best: ModelSpec,
    pub best_cv_score: f64,
    pub test_recall: f64,
    pub test_confusion: ConfusionMatrix,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} candidates scored by {}, {} failed",
            self.candidates.len(),
            self.scorer,
            self.failed
        )?;
        writeln!(f, "Best: {} (cv {}: {:.4})", self.best, self.scorer, self.best_cv_score)?;
        writeln!(f, "Test recall: {:.4}", self.test_recall)?;
        write!(f, "{}", self.test_confusion.render())
    }
}

/// Cross-validate every candidate, refit the best and score it on test
///
/// # Arguments
///
/// * `search` - Label for logs and the result ("grid", "random")
/// * `candidates` - Specs to compare, in tie-break order
/// * `data` - Train/test matrices; folds come from the training labels
pub fn run_search(
    search: &str,
    candidates: &[ModelSpec],
    data: &ViewData,
    cv_folds: usize,
    scorer: &Scorer,
) -> Result<SearchResult> {
    let folds = StratifiedKFold::new(&data.t_train, cv_folds)?;
    info!(
        "{search} search: {} candidates x {} folds",
        candidates.len(),
        folds.n_splits()
    );

    let fits_per_candidate = folds.n_splits() as u64;
    let pb = fit_progress_bar(
        candidates.len() as u64 * fits_per_candidate,
        &format!("{search} search"),
    );
    let scored: Vec<Option<CandidateScore>> = candidates
        .par_iter()
        .map(|spec| {
            let result = cross_val_score(spec, &data.x_train, &data.t_train, &folds, scorer);
            pb.inc(fits_per_candidate);
            match result {
                Ok(fold_scores) => Some(CandidateScore {
                    spec: spec.clone(),
                    mean_score: mean(&fold_scores),
                    fold_scores,
                }),
                Err(e) => {
                    warn!("{search} search: {spec} failed: {e}");
                    None
                }
            }
        })
        .collect();
    let failed = scored.iter().filter(|c| c.is_none()).count();
    finish_fit_progress(&pb, &format!("{failed} candidates failed"));
    let candidates: Vec<CandidateScore> = scored.into_iter().flatten().collect();
    let best = candidates
        .iter()
        .fold(None::<&CandidateScore>, |best, c| match best {
            Some(b) if b.mean_score >= c.mean_score => Some(b),
            _ => Some(c),
        })
        .ok_or_else(|| StopAnalysisError::model(format!("{search} search: every candidate failed")))?;

    let (_, evaluation) = evaluate(&best.spec, data)?;
    let result = SearchResult {
        search: search.to_string(),
        scorer: scorer.clone(),
        failed,
        best: best.spec.clone(),
        best_cv_score: best.mean_score,
        test_recall: evaluation.report.classes[1].recall,
        test_confusion: evaluation.confusion,
        candidates,
    };
    log_block(&format!("{search} search"), &result.to_string());
    Ok(result)
}
