//! Univariate feature scoring and the cuts applied to it.
//!
//! Scores are always stored next to their column name, so reordering the
//! matrix never changes which score belongs to which column.

use std::fmt;

use itertools::Itertools;
use ndarray::{Array1, ArrayView1};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::algorithm::features::matrix::FeatureMatrix;
use crate::algorithm::features::scaling::MinMaxScaler;
use crate::config::UnivariateCut;

/// Score of one feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub name: String,
    pub score: f64,
    pub p_value: Option<f64>,
}

/// How a score table was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreMethod {
    ChiSquared,
    MutualInformation,
}

impl fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChiSquared => f.write_str("chi-squared"),
            Self::MutualInformation => f.write_str("mutual information"),
        }
    }
}

/// Scores of every column of a matrix, in matrix column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub method: ScoreMethod,
    pub scores: Vec<FeatureScore>,
}

impl ScoreTable {
    #[must_use]
    pub fn score_of(&self, name: &str) -> Option<&FeatureScore> {
        self.scores.iter().find(|s| s.name == name)
    }

    /// Scores in ascending order; ties keep column order
    #[must_use]
    pub fn ascending(&self) -> Vec<&FeatureScore> {
        self.scores
            .iter()
            .sorted_by(|a, b| a.score.total_cmp(&b.score))
            .collect()
    }

    /// Column names surviving `cut`, in their original order
    #[must_use]
    pub fn kept(&self, cut: UnivariateCut) -> Vec<String> {
        let ascending = self.ascending();
        let dropped: Vec<&str> = match cut {
            UnivariateCut::All => Vec::new(),
            UnivariateCut::DropLowest(k) => ascending
                .iter()
                .take(k)
                .map(|s| s.name.as_str())
                .collect(),
            UnivariateCut::KeepTop(k) => ascending
                .iter()
                .take(ascending.len().saturating_sub(k))
                .map(|s| s.name.as_str())
                .collect(),
        };
        self.scores
            .iter()
            .filter(|s| !dropped.contains(&s.name.as_str()))
            .map(|s| s.name.clone())
            .collect()
    }

    /// Horizontal bar chart, highest score first, each bar labelled by name
    #[must_use]
    pub fn bar_chart(&self, width: usize) -> String {
        let max = self
            .scores
            .iter()
            .map(|s| s.score)
            .fold(0.0_f64, f64::max);
        let label_width = self.scores.iter().map(|s| s.name.len()).max().unwrap_or(0);

        let mut out = String::new();
        for s in self.ascending().into_iter().rev() {
            let len = if max > 0.0 {
                ((s.score / max) * width as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "{:<label_width$} | {:<width$} {:.4}\n",
                s.name,
                "#".repeat(len),
                s.score
            ));
        }
        out
    }
}

impl fmt::Display for ScoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} score per feature", self.method)?;
        write!(f, "{}", self.bar_chart(40))
    }
}

/// Chi-squared statistic of each column against the class labels
///
/// The matrix is min-max scaled first so every column is non-negative.
/// Columns whose total is zero score 0 with no p-value.
#[must_use]
pub fn chi2_scores(x: &FeatureMatrix, y: &Array1<usize>) -> ScoreTable {
    let scaled = MinMaxScaler::fit_transform(x.values());
    let n = y.len().max(1) as f64;
    let classes: Vec<usize> = y.iter().copied().unique().sorted().collect();
    let class_prob: Vec<f64> = classes
        .iter()
        .map(|&c| y.iter().filter(|&&l| l == c).count() as f64 / n)
        .collect();
    let df = classes.len().saturating_sub(1) as f64;
    let dist = ChiSquared::new(df).ok();

    let scores = x
        .names()
        .iter()
        .zip(scaled.columns())
        .map(|(name, column)| {
            let total: f64 = column.sum();
            if total <= 0.0 || dist.is_none() {
                return FeatureScore {
                    name: name.clone(),
                    score: 0.0,
                    p_value: None,
                };
            }
            let score: f64 = classes
                .iter()
                .zip(&class_prob)
                .map(|(&c, &p)| {
                    let observed: f64 = column
                        .iter()
                        .zip(y)
                        .filter(|&(_, &l)| l == c)
                        .map(|(v, _)| v)
                        .sum();
                    let expected = p * total;
                    (observed - expected).powi(2) / expected
                })
                .sum();
            FeatureScore {
                name: name.clone(),
                score,
                p_value: dist.as_ref().map(|d| d.sf(score)),
            }
        })
        .collect();

    ScoreTable {
        method: ScoreMethod::ChiSquared,
        scores,
    }
}

/// Discretize a column: observed values when it has at most `bins` distinct
/// values, equal-frequency bins otherwise
fn discretize(column: ArrayView1<'_, f64>, bins: usize) -> Vec<usize> {
    let distinct: Vec<f64> = column
        .iter()
        .copied()
        .sorted_by(f64::total_cmp)
        .dedup()
        .collect();

    if distinct.len() <= bins.max(1) {
        return column
            .iter()
            .map(|v| distinct.partition_point(|d| d < v))
            .collect();
    }

    // Rank of the first occurrence of each value decides its bin, so equal
    // values always share a bin
    let sorted: Vec<f64> = column.iter().copied().sorted_by(f64::total_cmp).collect();
    let n = sorted.len();
    column
        .iter()
        .map(|v| {
            let rank = sorted.partition_point(|s| s < v);
            (rank * bins / n).min(bins - 1)
        })
        .collect()
}

/// Plug-in mutual information (nats) between two discrete sequences
#[must_use]
pub fn mutual_information(a: &[usize], b: &[usize]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mut joint: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    let mut left: FxHashMap<usize, usize> = FxHashMap::default();
    let mut right: FxHashMap<usize, usize> = FxHashMap::default();
    for (&x, &y) in a.iter().zip(b) {
        *joint.entry((x, y)).or_insert(0) += 1;
        *left.entry(x).or_insert(0) += 1;
        *right.entry(y).or_insert(0) += 1;
    }
    let n = n as f64;
    joint
        .iter()
        .map(|(&(x, y), &count)| {
            let pxy = count as f64 / n;
            let px = left[&x] as f64 / n;
            let py = right[&y] as f64 / n;
            pxy * (pxy / (px * py)).ln()
        })
        .sum::<f64>()
        .max(0.0)
}

/// Mutual information of each column with the class labels
#[must_use]
pub fn mutual_info_scores(x: &FeatureMatrix, y: &Array1<usize>, bins: usize) -> ScoreTable {
    let labels = y.to_vec();
    let scores = x
        .names()
        .iter()
        .zip(x.values().columns())
        .map(|(name, column)| FeatureScore {
            name: name.clone(),
            score: mutual_information(&discretize(column, bins), &labels),
            p_value: None,
        })
        .collect();
    ScoreTable {
        method: ScoreMethod::MutualInformation,
        scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn matrix() -> (FeatureMatrix, Array1<usize>) {
        let x = FeatureMatrix::new(
            vec!["signal".into(), "noise".into(), "constant".into()],
            array![
                [1.0, 0.0, 3.0],
                [1.0, 1.0, 3.0],
                [1.0, 0.0, 3.0],
                [0.0, 1.0, 3.0],
                [0.0, 0.0, 3.0],
                [0.0, 1.0, 3.0],
            ],
        )
        .unwrap();
        (x, array![1, 1, 1, 0, 0, 0])
    }

    #[test]
    fn test_chi2_ranks_signal_first() {
        let (x, y) = matrix();
        let table = chi2_scores(&x, &y);
        let signal = table.score_of("signal").unwrap();
        let noise = table.score_of("noise").unwrap();
        assert!((signal.score - 3.0).abs() < 1e-12);
        assert!(signal.score > noise.score);
        assert!(signal.p_value.unwrap() < noise.p_value.unwrap());
        assert_eq!(table.score_of("constant").unwrap().p_value, None);
    }

    #[test]
    fn test_score_is_invariant_to_column_position() {
        let (x, y) = matrix();
        let reordered = x.select(&["constant", "noise", "signal"]).unwrap();
        for (a, b) in [
            (chi2_scores(&x, &y), chi2_scores(&reordered, &y)),
            (mutual_info_scores(&x, &y, 10), mutual_info_scores(&reordered, &y, 10)),
        ] {
            for name in ["signal", "noise", "constant"] {
                assert_eq!(a.score_of(name), b.score_of(name));
            }
        }
    }

    #[test]
    fn test_mutual_information_of_identical_binary() {
        let mi = mutual_information(&[0, 1, 0, 1], &[0, 1, 0, 1]);
        assert!((mi - std::f64::consts::LN_2).abs() < 1e-12);
        assert!(mutual_information(&[0, 0, 1, 1], &[0, 1, 0, 1]).abs() < 1e-12);
    }

    #[test]
    fn test_cuts() {
        let (x, y) = matrix();
        let table = chi2_scores(&x, &y);
        assert_eq!(table.kept(UnivariateCut::DropLowest(1)), vec!["signal", "noise"]);
        assert_eq!(table.kept(UnivariateCut::KeepTop(1)), vec!["signal"]);
        assert_eq!(table.kept(UnivariateCut::All).len(), 3);
        assert_eq!(table.kept(UnivariateCut::DropLowest(10)).len(), 0);
    }

    #[test]
    fn test_bar_chart_is_labelled_and_sorted() {
        let (x, y) = matrix();
        let chart = chi2_scores(&x, &y).bar_chart(10);
        let first = chart.lines().next().unwrap();
        assert!(first.starts_with("signal"));
        assert!(chart.lines().last().unwrap().starts_with("constant"));
    }

    #[test]
    fn test_equal_frequency_bins() {
        let column = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let bins = discretize(column.view(), 4);
        assert_eq!(bins, vec![0, 0, 1, 1, 2, 2, 3, 3]);
    }
}
