//! Binary classifiers over named feature matrices.
//!
//! Every classifier implements [`Classifier`]; its hyperparameters are
//! captured by a [`ModelSpec`], which is what searches enumerate and what
//! results serialize. Labels are 0/1 throughout.

pub mod bayes;
pub mod boosting;
pub mod fairness;
pub mod forest;
pub mod knn;
pub mod logistic;
pub mod tree;

use std::fmt::{self, Debug};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::algorithm::features::FeatureMatrix;
use crate::config::ModelingConfig;
use crate::error::{Result, StopAnalysisError};

pub use bayes::GaussianNb;
pub use boosting::GradientBoosting;
pub use fairness::DemographicParityClassifier;
pub use forest::{MaxFeatures, RandomForest};
pub use knn::KNearestNeighbors;
pub use logistic::{CoefficientReport, LogisticRegression, Penalty};
pub use tree::{RegressionTree, TreeParams};

/// Core trait for the binary classifiers
pub trait Classifier: Debug + Send + Sync {
    /// Hyperparameters this classifier was built from
    fn spec(&self) -> ModelSpec;

    /// Fit on a feature matrix and 0/1 labels
    ///
    /// # Arguments
    ///
    /// * `x` - Training features; later calls to `predict` must use the same columns
    /// * `y` - One label per row of `x`
    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<usize>) -> Result<()>;

    /// Probability of class 1 for each row
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>>;

    /// Class of each row; probabilities of exactly 0.5 go to class 0
    fn predict(&self, x: &FeatureMatrix) -> Result<Array1<usize>> {
        Ok(self.predict_proba(x)?.mapv(|p| usize::from(p > 0.5)))
    }

    /// Whether this classifier can be fit on `x` at all
    fn check_compatible(&self, _x: &FeatureMatrix) -> Result<()> {
        Ok(())
    }

    /// Display name
    fn name(&self) -> String {
        self.spec().name().to_string()
    }
}

/// Hyperparameters of one classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression {
        penalty: Penalty,
        max_iter: usize,
    },
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
    },
    RandomForest {
        n_estimators: usize,
        max_features: MaxFeatures,
        max_depth: Option<usize>,
        seed: u64,
    },
    KNearestNeighbors {
        k: usize,
    },
    GaussianNb {
        var_smoothing: f64,
    },
    DemographicParity {
        sensitive_column: String,
        covariance_threshold: f64,
        max_iter: usize,
    },
}

impl ModelSpec {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogisticRegression { .. } => "Logistic Reg",
            Self::GradientBoosting { .. } => "GradientBoostingClassifier",
            Self::RandomForest { .. } => "RandomForest",
            Self::KNearestNeighbors { .. } => "KNeighborsClassifier",
            Self::GaussianNb { .. } => "GaussianNB",
            Self::DemographicParity { .. } => "DemographicParityClassifier",
        }
    }

    /// A fresh, unfitted classifier with these hyperparameters
    #[must_use]
    pub fn build(&self) -> Box<dyn Classifier> {
        match self {
            Self::LogisticRegression { penalty, max_iter } => {
                Box::new(LogisticRegression::new(*penalty, *max_iter))
            }
            Self::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
            } => Box::new(GradientBoosting::new(*n_estimators, *learning_rate, *max_depth)),
            Self::RandomForest {
                n_estimators,
                max_features,
                max_depth,
                seed,
            } => Box::new(RandomForest::new(
                *n_estimators,
                *max_features,
                *max_depth,
                *seed,
            )),
            Self::KNearestNeighbors { k } => Box::new(KNearestNeighbors::new(*k)),
            Self::GaussianNb { var_smoothing } => Box::new(GaussianNb::new(*var_smoothing)),
            Self::DemographicParity {
                sensitive_column,
                covariance_threshold,
                max_iter,
            } => Box::new(DemographicParityClassifier::new(
                sensitive_column.clone(),
                *covariance_threshold,
                *max_iter,
            )),
        }
    }

    /// The six-model roster every panel run uses
    #[must_use]
    pub fn panel(config: &ModelingConfig) -> Vec<Self> {
        vec![
            Self::LogisticRegression {
                penalty: Penalty::L2,
                max_iter: config.logistic_max_iter,
            },
            Self::GradientBoosting {
                n_estimators: 100,
                learning_rate: 0.1,
                max_depth: 3,
            },
            Self::KNearestNeighbors {
                k: config.k_neighbors,
            },
            Self::GaussianNb {
                var_smoothing: 1e-9,
            },
            Self::RandomForest {
                n_estimators: 100,
                max_features: MaxFeatures::Sqrt,
                max_depth: None,
                seed: config.model_seed,
            },
            Self::DemographicParity {
                sensitive_column: config.sensitive_column.clone(),
                covariance_threshold: config.covariance_threshold,
                max_iter: config.logistic_max_iter,
            },
        ]
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogisticRegression { penalty, max_iter } => {
                write!(f, "{}(penalty={penalty}, max_iter={max_iter})", self.name())
            }
            Self::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
            } => write!(
                f,
                "{}(n_estimators={n_estimators}, learning_rate={learning_rate}, max_depth={max_depth})",
                self.name()
            ),
            Self::RandomForest {
                n_estimators,
                max_features,
                max_depth,
                ..
            } => write!(
                f,
                "{}(n_estimators={n_estimators}, max_features={max_features}, max_depth={max_depth:?})",
                self.name()
            ),
            Self::KNearestNeighbors { k } => write!(f, "{}(k={k})", self.name()),
            Self::GaussianNb { var_smoothing } => {
                write!(f, "{}(var_smoothing={var_smoothing:e})", self.name())
            }
            Self::DemographicParity {
                sensitive_column,
                covariance_threshold,
                ..
            } => write!(
                f,
                "{}(sensitive={sensitive_column}, covariance_threshold={covariance_threshold})",
                self.name()
            ),
        }
    }
}

/// Column names a classifier was fitted on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FittedColumns(Option<Vec<String>>);

impl FittedColumns {
    pub fn record(&mut self, x: &FeatureMatrix) {
        self.0 = Some(x.names().to_vec());
    }

    /// The fitted column names, or an error when the model is unfitted
    pub fn names(&self, model: &str) -> Result<&[String]> {
        self.0
            .as_deref()
            .ok_or_else(|| StopAnalysisError::model(format!("{model} used before fit")))
    }

    /// `x` must have exactly the fitted columns, in order
    pub fn ensure(&self, model: &str, x: &FeatureMatrix) -> Result<()> {
        let fitted = self.names(model)?;
        if fitted == x.names() {
            return Ok(());
        }
        let column = fitted
            .iter()
            .find(|n| !x.names().contains(*n))
            .or_else(|| x.names().iter().find(|n| !fitted.contains(*n)))
            .cloned()
            .unwrap_or_else(|| "<column order>".to_string());
        Err(StopAnalysisError::IncompatibleFeatures {
            model: model.to_string(),
            column,
        })
    }
}

/// Labels must be 0/1 and match the row count
pub(crate) fn check_training_data(model: &str, x: &FeatureMatrix, y: &Array1<usize>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(StopAnalysisError::model(format!(
            "{model}: {} rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(StopAnalysisError::model(format!("{model}: empty training set")));
    }
    if y.iter().any(|&l| l > 1) {
        return Err(StopAnalysisError::model(format!("{model}: labels must be 0 or 1")));
    }
    Ok(())
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
