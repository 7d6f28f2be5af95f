//! Logistic regression fitted by accelerated proximal gradient descent.
//!
//! Features are standardized before fitting; coefficients are reported on
//! the original feature scale. The same solver backs the demographic-parity
//! classifier, which adds a projection onto its covariance constraint.

use std::fmt;

use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::algorithm::classify::{Classifier, FittedColumns, ModelSpec, check_training_data, sigmoid};
use crate::algorithm::features::{FeatureMatrix, Standardizer};
use crate::error::{Result, StopAnalysisError};

/// Regularization applied to the weights (never the intercept)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    None,
    L1,
    L2,
    /// Equal mix of L1 and L2
    ElasticNet,
}

impl Penalty {
    /// (L1, L2) strengths for inverse regularization `c` over `n` rows
    fn strengths(self, c: f64, n: usize) -> (f64, f64) {
        let alpha = 1.0 / (c * n.max(1) as f64);
        match self {
            Self::None => (0.0, 0.0),
            Self::L1 => (alpha, 0.0),
            Self::L2 => (0.0, alpha),
            Self::ElasticNet => (0.5 * alpha, 0.5 * alpha),
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::L1 => f.write_str("l1"),
            Self::L2 => f.write_str("l2"),
            Self::ElasticNet => f.write_str("elasticnet"),
        }
    }
}

/// Linear constraint `|a . w| <= bound` on the weights
#[derive(Debug, Clone)]
pub(crate) struct Slab {
    pub normal: Array1<f64>,
    pub bound: f64,
}

impl Slab {
    fn project(&self, w: &mut Array1<f64>) {
        let norm_sq = self.normal.dot(&self.normal);
        if norm_sq <= f64::EPSILON {
            return;
        }
        let value = self.normal.dot(w);
        let excess = if value > self.bound {
            value - self.bound
        } else if value < -self.bound {
            value + self.bound
        } else {
            return;
        };
        w.scaled_add(-excess / norm_sq, &self.normal);
    }
}

/// Solver settings for a penalized logistic loss
#[derive(Debug, Clone)]
pub(crate) struct LogisticSolver {
    pub penalty: Penalty,
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub constraint: Option<Slab>,
}

/// Fitted weights, intercept and iterations used
pub(crate) struct LinearFit {
    pub weights: Array1<f64>,
    pub intercept: f64,
    pub iterations: usize,
}

/// Largest eigenvalue of `[z 1]^T [z 1] / n` by power iteration
fn max_eigenvalue(z: &Array2<f64>) -> f64 {
    let n = z.nrows().max(1) as f64;
    let mut v_w = Array1::<f64>::from_elem(z.ncols(), 1.0);
    let mut v_b = 1.0;
    let mut lambda = 1.0;
    for _ in 0..30 {
        let av = z.dot(&v_w) + v_b;
        let mut next_w = z.t().dot(&av) / n;
        let mut next_b = av.sum() / n;
        let norm = (next_w.dot(&next_w) + next_b * next_b).sqrt();
        if norm <= f64::EPSILON {
            return 1.0;
        }
        lambda = norm / (v_w.dot(&v_w) + v_b * v_b).sqrt();
        next_w /= norm;
        next_b /= norm;
        v_w = next_w;
        v_b = next_b;
    }
    lambda
}

fn soft_threshold(w: &mut Array1<f64>, amount: f64) {
    if amount > 0.0 {
        w.mapv_inplace(|v| v.signum() * (v.abs() - amount).max(0.0));
    }
}

impl LogisticSolver {
    /// Minimize mean log-loss plus penalty over standardized features `z`
    pub fn solve(&self, z: &Array2<f64>, y: &Array1<usize>) -> LinearFit {
        let n = z.nrows();
        let (l1, l2) = self.penalty.strengths(self.c, n);
        let step = 1.0 / (0.25 * max_eigenvalue(z) + l2);
        let target = y.mapv(|l| l as f64);

        let mut w = Array1::<f64>::zeros(z.ncols());
        let mut b = 0.0;
        let mut m_w = w.clone();
        let mut m_b = b;
        let mut t = 1.0_f64;
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;
            let residual = (z.dot(&m_w) + m_b).mapv(sigmoid) - &target;
            let grad_w = z.t().dot(&residual) / n as f64 + &m_w * l2;
            let grad_b = residual.sum() / n as f64;

            let mut next_w = &m_w - &(grad_w * step);
            let next_b = m_b - step * grad_b;
            soft_threshold(&mut next_w, step * l1);
            if let Some(slab) = &self.constraint {
                slab.project(&mut next_w);
            }

            let change = (&next_w - &w)
                .iter()
                .fold((next_b - b).abs(), |acc, d| acc.max(d.abs()));

            let next_t = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
            let momentum = (t - 1.0) / next_t;
            m_w = &next_w + &((&next_w - &w) * momentum);
            m_b = next_b + momentum * (next_b - b);
            if let Some(slab) = &self.constraint {
                slab.project(&mut m_w);
            }

            w = next_w;
            b = next_b;
            t = next_t;

            if change < self.tol {
                break;
            }
        }

        LinearFit {
            weights: w,
            intercept: b,
            iterations,
        }
    }
}

/// One fitted coefficient paired with its column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub column: String,
    pub coefficient: f64,
}

/// Coefficients of a fitted logistic regression, in column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientReport {
    pub intercept: f64,
    pub coefficients: Vec<Coefficient>,
}

impl fmt::Display for CoefficientReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.coefficients {
            writeln!(f, "Column: {} | Coefficient: {:.6}", c.column, c.coefficient)?;
        }
        writeln!(f, "Intercept: {:.6}", self.intercept)
    }
}

/// Standardized fit shared by the linear classifiers
#[derive(Debug, Clone, Default)]
pub(crate) struct LinearState {
    pub scaler: Option<Standardizer>,
    pub weights: Array1<f64>,
    pub intercept: f64,
    pub columns: FittedColumns,
}

impl LinearState {
    pub fn decision(&self, model: &str, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.columns.ensure(model, x)?;
        let scaler = self
            .scaler
            .as_ref()
            .ok_or_else(|| StopAnalysisError::model(format!("{model} used before fit")))?;
        Ok(scaler.transform(x.values()).dot(&self.weights) + self.intercept)
    }

    /// Weights and intercept mapped back to unstandardized features
    pub fn original_scale(&self) -> Option<(Array1<f64>, f64)> {
        let scaler = self.scaler.as_ref()?;
        let weights = &self.weights / &scaler.scale;
        let intercept = self.intercept - weights.dot(&scaler.mean);
        Some((weights, intercept))
    }
}

/// Penalized logistic regression (inverse regularization strength 1)
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub penalty: Penalty,
    pub max_iter: usize,
    state: LinearState,
}

impl LogisticRegression {
    #[must_use]
    pub fn new(penalty: Penalty, max_iter: usize) -> Self {
        Self {
            penalty,
            max_iter,
            state: LinearState::default(),
        }
    }

    /// Coefficients on the original feature scale
    pub fn coefficients(&self) -> Result<CoefficientReport> {
        let names = self.state.columns.names("Logistic Reg")?;
        let (weights, intercept) = self
            .state
            .original_scale()
            .ok_or_else(|| StopAnalysisError::model("Logistic Reg used before fit"))?;
        Ok(CoefficientReport {
            intercept,
            coefficients: names
                .iter()
                .zip(weights.iter())
                .map(|(column, &coefficient)| Coefficient {
                    column: column.clone(),
                    coefficient,
                })
                .collect(),
        })
    }
}

impl Classifier for LogisticRegression {
    fn spec(&self) -> ModelSpec {
        ModelSpec::LogisticRegression {
            penalty: self.penalty,
            max_iter: self.max_iter,
        }
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<usize>) -> Result<()> {
        check_training_data("Logistic Reg", x, y)?;
        let scaler = Standardizer::fit(x.values());
        let z = scaler.transform(x.values());
        let fit = LogisticSolver {
            penalty: self.penalty,
            c: 1.0,
            max_iter: self.max_iter,
            tol: 1e-6,
            constraint: None,
        }
        .solve(&z, y);
        debug!(
            "Logistic regression ({}) finished after {} iterations",
            self.penalty, fit.iterations
        );

        self.state.scaler = Some(scaler);
        self.state.weights = fit.weights;
        self.state.intercept = fit.intercept;
        self.state.columns.record(x);
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        Ok(self.state.decision("Logistic Reg", x)?.mapv(sigmoid))
    }
}

/// Mean of each column of `z`, weighted by the centred sensitive values
pub(crate) fn covariance_direction(z: &Array2<f64>, sensitive: &Array1<f64>) -> Array1<f64> {
    let n = z.nrows().max(1) as f64;
    let centred = sensitive - sensitive.mean().unwrap_or(0.0);
    z.t().dot(&centred) / n
}
