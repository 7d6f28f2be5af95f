//! SMOTE-NC oversampling of the minority class.
//!
//! Continuous columns of a synthetic row are interpolated between a minority
//! sample and one of its nearest minority neighbours. Categorical columns
//! take the most frequent value among the sample's neighbours, so every
//! synthetic value is one that was observed.

use std::cmp::Ordering;

use log::{error, info, warn};
use rand::prelude::*;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};

use crate::algorithm::features::table::{CATEGORICAL_COLUMNS, LabeledTable, StopFeatures};
use crate::models::{StopRecord, Target};

/// Neighbour positions of one minority sample
type Neighbours = SmallVec<[usize; 8]>;

/// SMOTE-NC parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoteNc {
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Default for SmoteNc {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
        }
    }
}

fn population_std(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n == 0 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    (values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Most frequent value; ties go to the smallest value
fn mode<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(v, _)| v.to_string())
        .unwrap_or_default()
}

impl SmoteNc {
    #[must_use]
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self { k_neighbors, seed }
    }

    /// Squared distance: Euclidean on continuous columns plus `penalty` per
    /// mismatched categorical
    fn distance(a: &StopFeatures, b: &StopFeatures, penalty: f64) -> f64 {
        let continuous: f64 = a
            .continuous
            .iter()
            .zip(&b.continuous)
            .map(|(x, y)| (x - y).powi(2))
            .sum();
        let mismatches = a
            .categorical
            .iter()
            .zip(&b.categorical)
            .filter(|(x, y)| x != y)
            .count();
        continuous + penalty * mismatches as f64
    }

    /// k nearest minority neighbours of each minority sample (positions into
    /// `minority`), nearest first; a lone sample is its own neighbour
    fn neighbours(&self, minority: &[&StopFeatures], penalty: f64) -> Vec<Neighbours> {
        let k = self.k_neighbors.min(minority.len().saturating_sub(1));
        minority
            .par_iter()
            .enumerate()
            .map(|(i, sample)| {
                if k == 0 {
                    return smallvec![i];
                }
                let mut candidates: Vec<(f64, usize)> = minority
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(j, other)| (Self::distance(sample, other, penalty), j))
                    .collect();
                candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                candidates.into_iter().take(k).map(|(_, j)| j).collect()
            })
            .collect()
    }

    /// Oversample the minority class of `table` until both classes are equal
    #[must_use]
    pub fn resample(&self, table: &LabeledTable) -> LabeledTable {
        let [negatives, positives] = table.class_counts();
        if negatives == positives {
            return table.clone();
        }
        if negatives == 0 || positives == 0 {
            warn!(
                "Target {} has a single class ({negatives} negatives, {positives} positives); nothing to oversample",
                table.target
            );
            return table.clone();
        }

        let (minority_label, to_generate) = match negatives.cmp(&positives) {
            Ordering::Less => (0, positives - negatives),
            _ => (1, negatives - positives),
        };
        let minority: Vec<&StopFeatures> = table
            .rows
            .iter()
            .zip(&table.labels)
            .filter(|&(_, &label)| label == minority_label)
            .map(|(row, _)| row)
            .collect();

        let stds: Vec<f64> = (0..minority[0].continuous.len())
            .map(|c| population_std(minority.iter().map(move |r| r.continuous[c])))
            .collect();
        let penalty = median(stds).powi(2);

        let neighbours = self.neighbours(&minority, penalty);
        let modes: Vec<Vec<String>> = neighbours
            .par_iter()
            .map(|nn| {
                (0..CATEGORICAL_COLUMNS.len())
                    .map(|c| mode(nn.iter().map(|&j| minority[j].categorical[c].as_str())))
                    .collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut rows = table.rows.clone();
        let mut labels = table.labels.clone();
        rows.reserve(to_generate);
        labels.reserve(to_generate);

        for _ in 0..to_generate {
            let base = rng.random_range(0..minority.len());
            let partner = neighbours[base][rng.random_range(0..neighbours[base].len())];
            let step: f64 = rng.random();

            let sample = minority[base];
            let other = minority[partner];
            let mut continuous = sample.continuous;
            for (value, target) in continuous.iter_mut().zip(&other.continuous) {
                *value += step * (target - *value);
            }
            let categorical: [String; 8] = std::array::from_fn(|c| modes[base][c].clone());

            rows.push(StopFeatures {
                categorical,
                continuous,
            });
            labels.push(minority_label);
        }

        info!(
            "SMOTE-NC on {}: generated {to_generate} synthetic rows for class {minority_label} ({} -> {} rows)",
            table.target,
            table.len(),
            rows.len()
        );

        LabeledTable {
            target: table.target,
            rows,
            labels,
        }
    }
}

/// Rebalance `records` on the target named `target_column`
///
/// Returns `None` (after logging) when the column is not a binary target of
/// the cleaned table.
#[must_use]
pub fn upsample(records: &[StopRecord], target_column: &str, params: &SmoteNc) -> Option<LabeledTable> {
    let Some(target) = Target::from_column_name(target_column) else {
        error!("Could not find target column '{target_column}' in the training data");
        return None;
    };
    Some(params.resample(&LabeledTable::from_records(records, target)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(reason: &str, age: f64) -> StopFeatures {
        StopFeatures {
            categorical: std::array::from_fn(|c| {
                if c == 0 {
                    reason.to_string()
                } else {
                    "1".to_string()
                }
            }),
            continuous: [5.0, age],
        }
    }

    fn table() -> LabeledTable {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            rows.push(features("Speeding", 20.0 + i as f64));
            labels.push(0);
        }
        for (i, reason) in ["Investigation", "Investigation", "SeatBelt", "Investigation"]
            .iter()
            .enumerate()
        {
            rows.push(features(reason, 50.0 + i as f64));
            labels.push(1);
        }
        LabeledTable {
            target: Target::SearchConducted,
            rows,
            labels,
        }
    }

    #[test]
    fn test_mode_prefers_smallest_on_tie() {
        assert_eq!(mode(["b", "a", "b", "a"].into_iter()), "a");
        assert_eq!(mode(["c", "b", "c"].into_iter()), "c");
    }

    #[test]
    fn test_resample_reaches_parity() {
        let out = SmoteNc::default().resample(&table());
        assert_eq!(out.class_counts(), [20, 20]);
        assert_eq!(out.len(), 40);
    }

    #[test]
    fn test_synthetic_values_stay_in_range() {
        let out = SmoteNc::default().resample(&table());
        let observed = ["Investigation", "SeatBelt"];
        for row in &out.rows[24..] {
            assert!(observed.contains(&row.categorical[0].as_str()));
            let age = row.continuous[1];
            assert!((50.0..=53.0).contains(&age), "age {age} outside minority range");
        }
    }

    #[test]
    fn test_resample_is_seeded() {
        let a = SmoteNc::new(3, 7).resample(&table());
        let b = SmoteNc::new(3, 7).resample(&table());
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_target_returns_none() {
        assert!(upsample(&[], "Outcome", &SmoteNc::default()).is_none());
        assert!(upsample(&[], "Arrest", &SmoteNc::default()).is_some());
    }
}
