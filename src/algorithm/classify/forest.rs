//! Random forest of bootstrapped regression trees on the 0/1 labels.

use std::fmt;

use ndarray::{Array1, Axis};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithm::classify::tree::{RegressionTree, TreeParams};
use crate::algorithm::classify::{Classifier, FittedColumns, ModelSpec, check_training_data};
use crate::algorithm::features::FeatureMatrix;
use crate::error::Result;

const NAME: &str = "RandomForest";

/// Features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    All,
    Count(usize),
}

impl MaxFeatures {
    /// Concrete count for `n_features` columns, at least 1
    #[must_use]
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            Self::Sqrt => (n_features as f64).sqrt().floor() as usize,
            Self::All => n_features,
            Self::Count(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqrt => f.write_str("sqrt"),
            Self::All => f.write_str("all"),
            Self::Count(k) => write!(f, "{k}"),
        }
    }
}

/// Bagged trees with per-split feature subsampling
///
/// Tree `i` draws its bootstrap and feature subsets from `seed + i`, so the
/// fitted forest does not depend on how rayon schedules the trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_features: MaxFeatures,
    pub max_depth: Option<usize>,
    pub seed: u64,
    trees: Vec<RegressionTree>,
    columns: FittedColumns,
}

impl RandomForest {
    #[must_use]
    pub fn new(
        n_estimators: usize,
        max_features: MaxFeatures,
        max_depth: Option<usize>,
        seed: u64,
    ) -> Self {
        Self {
            n_estimators,
            max_features,
            max_depth,
            seed,
            trees: Vec::new(),
            columns: FittedColumns::default(),
        }
    }
}

impl Classifier for RandomForest {
    fn spec(&self) -> ModelSpec {
        ModelSpec::RandomForest {
            n_estimators: self.n_estimators,
            max_features: self.max_features,
            max_depth: self.max_depth,
            seed: self.seed,
        }
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<usize>) -> Result<()> {
        check_training_data(NAME, x, y)?;
        let target: Vec<f64> = y.iter().map(|&l| l as f64).collect();
        let weight = vec![1.0; target.len()];
        let params = TreeParams {
            max_depth: self.max_depth,
            max_features: Some(self.max_features.resolve(x.ncols())),
            ..TreeParams::default()
        };
        let n = x.nrows();

        self.trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let rows: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::fit(x.values(), &target, &weight, &rows, params, Some(&mut rng))
            })
            .collect();

        self.columns.record(x);
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.columns.ensure(NAME, x)?;
        let n_trees = self.trees.len().max(1) as f64;
        Ok(x.values()
            .axis_iter(Axis(0))
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }
}
