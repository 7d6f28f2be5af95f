//! Gradient-boosted trees on the binomial deviance.

use log::debug;
use ndarray::{Array1, Axis};

use crate::algorithm::classify::tree::{RegressionTree, TreeParams};
use crate::algorithm::classify::{Classifier, FittedColumns, ModelSpec, check_training_data, sigmoid};
use crate::algorithm::features::FeatureMatrix;
use crate::error::{Result, StopAnalysisError};

const NAME: &str = "GradientBoostingClassifier";

/// Boosted regression trees starting from the prior log-odds
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    initial: f64,
    trees: Vec<RegressionTree>,
    columns: FittedColumns,
}

impl GradientBoosting {
    #[must_use]
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth,
            initial: 0.0,
            trees: Vec::new(),
            columns: FittedColumns::default(),
        }
    }

    fn decision(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.columns.ensure(NAME, x)?;
        Ok(x.values()
            .axis_iter(Axis(0))
            .map(|row| {
                self.initial
                    + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect())
    }
}

impl Classifier for GradientBoosting {
    fn spec(&self) -> ModelSpec {
        ModelSpec::GradientBoosting {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
        }
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<usize>) -> Result<()> {
        check_training_data(NAME, x, y)?;
        if self.learning_rate <= 0.0 {
            return Err(StopAnalysisError::model(format!(
                "{NAME}: learning rate must be positive, got {}",
                self.learning_rate
            )));
        }

        let labels: Vec<f64> = y.iter().map(|&l| l as f64).collect();
        let prior = labels.iter().sum::<f64>() / labels.len() as f64;
        let prior = prior.clamp(1e-12, 1.0 - 1e-12);
        self.initial = (prior / (1.0 - prior)).ln();

        let params = TreeParams {
            max_depth: Some(self.max_depth),
            ..TreeParams::default()
        };
        let rows: Vec<usize> = (0..x.nrows()).collect();
        let mut raw = vec![self.initial; x.nrows()];
        self.trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let prob: Vec<f64> = raw.iter().map(|&f| sigmoid(f)).collect();
            let residual: Vec<f64> = labels.iter().zip(&prob).map(|(y, p)| y - p).collect();
            let hessian: Vec<f64> = prob.iter().map(|p| p * (1.0 - p)).collect();

            let tree = RegressionTree::fit(x.values(), &residual, &hessian, &rows, params, None);
            for (value, row) in raw.iter_mut().zip(x.values().axis_iter(Axis(0))) {
                *value += self.learning_rate * tree.predict_row(row);
            }
            self.trees.push(tree);
        }
        debug!("{NAME}: fitted {} trees", self.trees.len());

        self.columns.record(x);
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        Ok(self.decision(x)?.mapv(sigmoid))
    }
}
