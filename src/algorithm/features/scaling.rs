//! Column scalers fitted on one matrix and applied to others.

use ndarray::{Array1, Array2, Axis};

/// Rescale each column to `[0, 1]`; constant columns map to 0
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    range: Array1<f64>,
}

impl MinMaxScaler {
    #[must_use]
    pub fn fit(x: &Array2<f64>) -> Self {
        let min = x.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let range = &max - &min;
        Self { min, range }
    }

    #[must_use]
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x - &self.min;
        for (mut column, &range) in out.columns_mut().into_iter().zip(&self.range) {
            if range > 0.0 {
                column /= range;
            } else {
                column.fill(0.0);
            }
        }
        out
    }

    #[must_use]
    pub fn fit_transform(x: &Array2<f64>) -> Array2<f64> {
        Self::fit(x).transform(x)
    }
}

/// Zero mean, unit variance per column; constant columns are only centred
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl Standardizer {
    #[must_use]
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let var = x
            .axis_iter(Axis(0))
            .fold(Array1::<f64>::zeros(x.ncols()), |acc, row| {
                acc + (&row - &mean).mapv(|d| d * d)
            })
            / n;
        let scale = var.mapv(|v| if v > 0.0 { v.sqrt() } else { 1.0 });
        Self { mean, scale }
    }

    #[must_use]
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}
