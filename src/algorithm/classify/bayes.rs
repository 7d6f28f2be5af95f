//! Gaussian naive Bayes.

use ndarray::{Array1, Array2, Axis};

use crate::algorithm::classify::{Classifier, FittedColumns, ModelSpec, check_training_data};
use crate::algorithm::features::FeatureMatrix;
use crate::error::{Result, StopAnalysisError};

const NAME: &str = "GaussianNB";

#[derive(Debug, Clone)]
struct ClassModel {
    log_prior: f64,
    mean: Array1<f64>,
    var: Array1<f64>,
}

impl ClassModel {
    fn log_likelihood(&self, row: ndarray::ArrayView1<'_, f64>) -> f64 {
        let mut total = self.log_prior;
        for ((&v, &mean), &var) in row.iter().zip(&self.mean).zip(&self.var) {
            total -= 0.5 * (2.0 * std::f64::consts::PI * var).ln();
            total -= (v - mean).powi(2) / (2.0 * var);
        }
        total
    }
}

/// Per-class independent normals with variance smoothing
///
/// `var_smoothing` times the largest feature variance is added to every
/// class variance.
#[derive(Debug, Clone)]
pub struct GaussianNb {
    pub var_smoothing: f64,
    classes: [Option<ClassModel>; 2],
    columns: FittedColumns,
}

impl GaussianNb {
    #[must_use]
    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            classes: [None, None],
            columns: FittedColumns::default(),
        }
    }
}

fn column_moments(x: &Array2<f64>) -> (Array1<f64>, Array1<f64>) {
    let mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let var = x.var_axis(Axis(0), 0.0);
    (mean, var)
}

impl Classifier for GaussianNb {
    fn spec(&self) -> ModelSpec {
        ModelSpec::GaussianNb {
            var_smoothing: self.var_smoothing,
        }
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<usize>) -> Result<()> {
        check_training_data(NAME, x, y)?;
        let (_, overall_var) = column_moments(x.values());
        let epsilon = self.var_smoothing * overall_var.fold(0.0_f64, |acc, &v| acc.max(v));
        let n = y.len() as f64;

        for label in 0..2 {
            let rows: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == label)
                .map(|(i, _)| i)
                .collect();
            self.classes[label] = if rows.is_empty() {
                None
            } else {
                let subset = x.values().select(Axis(0), &rows);
                let (mean, var) = column_moments(&subset);
                Some(ClassModel {
                    log_prior: (rows.len() as f64 / n).ln(),
                    mean,
                    var: var.mapv(|v| (v + epsilon).max(f64::MIN_POSITIVE)),
                })
            };
        }

        self.columns.record(x);
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.columns.ensure(NAME, x)?;
        let proba = x
            .values()
            .axis_iter(Axis(0))
            .map(|row| match (&self.classes[0], &self.classes[1]) {
                (Some(neg), Some(pos)) => {
                    let a = neg.log_likelihood(row);
                    let b = pos.log_likelihood(row);
                    let max = a.max(b);
                    let eb = (b - max).exp();
                    Ok(eb / ((a - max).exp() + eb))
                }
                (Some(_), None) => Ok(0.0),
                (None, Some(_)) => Ok(1.0),
                (None, None) => Err(StopAnalysisError::model(format!("{NAME} used before fit"))),
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from(proba))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separates_gaussian_blobs() {
        let x = FeatureMatrix::new(
            vec!["a".into()],
            array![[0.0], [0.5], [1.0], [9.0], [9.5], [10.0]],
        )
        .unwrap();
        let y = array![0, 0, 0, 1, 1, 1];
        let mut model = GaussianNb::new(1e-9);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
        let p = model.predict_proba(&x).unwrap();
        assert!(p[0] < 0.01 && p[5] > 0.99);
    }

    #[test]
    fn test_constant_feature_needs_smoothing() {
        let x = FeatureMatrix::new(vec!["a".into(), "c".into()], array![[0.0, 1.0], [1.0, 1.0]]).unwrap();
        let y = array![0, 1];
        let mut model = GaussianNb::new(1e-9);
        model.fit(&x, &y).unwrap();
        assert!(model.predict_proba(&x).unwrap().iter().all(|p| p.is_finite()));
    }
}
