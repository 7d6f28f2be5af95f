//! Named feature matrices.

use ndarray::{Array1, Array2, Axis};

use crate::error::{Result, StopAnalysisError};

/// A dense feature matrix whose columns carry names
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Pair column names with a matrix; the counts must agree
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(StopAnalysisError::SchemaMismatch(format!(
                "{} column names for a matrix with {} columns",
                names.len(),
                values.ncols()
            )));
        }
        Ok(Self { names, values })
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// A column by name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Array1<f64>> {
        self.index_of(name).map(|i| self.values.column(i).to_owned())
    }

    /// Keep the columns at `indices`, in that order
    #[must_use]
    pub fn select_indices(&self, indices: &[usize]) -> Self {
        Self {
            names: indices.iter().map(|&i| self.names[i].clone()).collect(),
            values: self.values.select(Axis(1), indices),
        }
    }

    /// Keep the named columns, in the given order; unknown names are an error
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|n| {
                self.index_of(n.as_ref()).ok_or_else(|| {
                    StopAnalysisError::SchemaMismatch(format!("no feature column '{}'", n.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.select_indices(&indices))
    }

    /// Remove the named columns; names that are not present are ignored
    #[must_use]
    pub fn drop<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let keep: Vec<usize> = (0..self.ncols())
            .filter(|&i| !names.iter().any(|n| n.as_ref() == self.names[i]))
            .collect();
        self.select_indices(&keep)
    }

    /// Keep the rows at `indices`
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }
}
