//! Logistic regression under a demographic-parity constraint.
//!
//! The covariance between the sensitive column and the decision function
//! is kept within `[-c, c]`. The sensitive column itself is never a
//! predictor; it must be present in the matrix passed to `fit`.

use log::debug;
use ndarray::Array1;

use crate::algorithm::classify::logistic::{
    LinearState, LogisticSolver, Penalty, Slab, covariance_direction,
};
use crate::algorithm::classify::{Classifier, ModelSpec, check_training_data, sigmoid};
use crate::algorithm::features::{FeatureMatrix, Standardizer};
use crate::error::{Result, StopAnalysisError};

const NAME: &str = "DemographicParityClassifier";

#[derive(Debug, Clone)]
pub struct DemographicParityClassifier {
    pub sensitive_column: String,
    pub covariance_threshold: f64,
    pub max_iter: usize,
    /// Regularization of the underlying logistic fit, L1 with `c = 1` unless changed
    pub penalty: Penalty,
    state: LinearState,
}

impl DemographicParityClassifier {
    #[must_use]
    pub fn new(sensitive_column: String, covariance_threshold: f64, max_iter: usize) -> Self {
        Self {
            sensitive_column,
            covariance_threshold,
            max_iter,
            penalty: Penalty::L1,
            state: LinearState::default(),
        }
    }

    fn predictors(&self, x: &FeatureMatrix) -> FeatureMatrix {
        x.drop(&[self.sensitive_column.as_str()])
    }

    /// Sample covariance between the sensitive column and the fitted decision function
    pub fn decision_covariance(&self, x: &FeatureMatrix) -> Result<f64> {
        self.check_compatible(x)?;
        let sensitive = x
            .column(&self.sensitive_column)
            .ok_or_else(|| self.missing_sensitive())?;
        let decision = self.state.decision(NAME, &self.predictors(x))?;
        let n = decision.len().max(1) as f64;
        let centred = &sensitive - sensitive.mean().unwrap_or(0.0);
        Ok(centred.dot(&decision) / n)
    }

    fn missing_sensitive(&self) -> StopAnalysisError {
        StopAnalysisError::IncompatibleFeatures {
            model: NAME.to_string(),
            column: self.sensitive_column.clone(),
        }
    }
}

impl Classifier for DemographicParityClassifier {
    fn spec(&self) -> ModelSpec {
        ModelSpec::DemographicParity {
            sensitive_column: self.sensitive_column.clone(),
            covariance_threshold: self.covariance_threshold,
            max_iter: self.max_iter,
        }
    }

    fn check_compatible(&self, x: &FeatureMatrix) -> Result<()> {
        if x.contains(&self.sensitive_column) {
            Ok(())
        } else {
            Err(self.missing_sensitive())
        }
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<usize>) -> Result<()> {
        check_training_data(NAME, x, y)?;
        self.check_compatible(x)?;
        if self.covariance_threshold < 0.0 {
            return Err(StopAnalysisError::model(format!(
                "{NAME}: covariance threshold must be non-negative, got {}",
                self.covariance_threshold
            )));
        }

        let sensitive = x
            .column(&self.sensitive_column)
            .ok_or_else(|| self.missing_sensitive())?;
        let predictors = self.predictors(x);
        let scaler = Standardizer::fit(predictors.values());
        let z = scaler.transform(predictors.values());

        let fit = LogisticSolver {
            penalty: self.penalty,
            c: 1.0,
            max_iter: self.max_iter,
            tol: 1e-6,
            constraint: Some(Slab {
                normal: covariance_direction(&z, &sensitive),
                bound: self.covariance_threshold,
            }),
        }
        .solve(&z, y);
        debug!(
            "{NAME} (c={}) finished after {} iterations",
            self.covariance_threshold, fit.iterations
        );

        self.state.scaler = Some(scaler);
        self.state.weights = fit.weights;
        self.state.intercept = fit.intercept;
        self.state.columns.record(&predictors);
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.check_compatible(x)?;
        Ok(self.state.decision(NAME, &self.predictors(x))?.mapv(sigmoid))
    }
}
