//! Brute-force k-nearest-neighbours classification.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;

use crate::algorithm::classify::{Classifier, FittedColumns, ModelSpec, check_training_data};
use crate::algorithm::features::FeatureMatrix;
use crate::error::{Result, StopAnalysisError};

const NAME: &str = "KNeighborsClassifier";

/// Majority vote of the k nearest training rows (Euclidean distance)
///
/// Equal distances keep training order; a tied vote goes to class 0.
#[derive(Debug, Clone)]
pub struct KNearestNeighbors {
    pub k: usize,
    train: Option<(Array2<f64>, Array1<usize>)>,
    columns: FittedColumns,
}

impl KNearestNeighbors {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            train: None,
            columns: FittedColumns::default(),
        }
    }

    fn vote(&self, x: &Array2<f64>, y: &Array1<usize>, row: ArrayView1<'_, f64>) -> f64 {
        let mut distances: Vec<(f64, usize)> = x
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(i, other)| {
                let d: f64 = row
                    .iter()
                    .zip(other.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum();
                (d, i)
            })
            .collect();
        let k = self.k.min(distances.len());
        if k < distances.len() {
            distances.select_nth_unstable_by(k, |a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        }
        let positives = distances[..k].iter().filter(|(_, i)| y[*i] == 1).count();
        positives as f64 / k.max(1) as f64
    }
}

impl Classifier for KNearestNeighbors {
    fn spec(&self) -> ModelSpec {
        ModelSpec::KNearestNeighbors { k: self.k }
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<usize>) -> Result<()> {
        check_training_data(NAME, x, y)?;
        if self.k == 0 {
            return Err(StopAnalysisError::model(format!("{NAME}: k must be positive")));
        }
        self.train = Some((x.values().clone(), y.clone()));
        self.columns.record(x);
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.columns.ensure(NAME, x)?;
        let (train_x, train_y) = self
            .train
            .as_ref()
            .ok_or_else(|| StopAnalysisError::model(format!("{NAME} used before fit")))?;
        let rows: Vec<ArrayView1<'_, f64>> = x.values().axis_iter(Axis(0)).collect();
        let proba: Vec<f64> = rows
            .par_iter()
            .map(|row| self.vote(train_x, train_y, row.view()))
            .collect();
        Ok(Array1::from(proba))
    }
}
