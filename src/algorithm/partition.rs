//! Era partitions, trimmed variants and the seeded train/test split.

use chrono::NaiveDate;
use log::info;
use rand::prelude::*;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::models::StopRecord;

/// Records split around the era threshold
#[derive(Debug, Clone, Default)]
pub struct Eras {
    /// `month_of_stop < threshold`
    pub pre: Vec<StopRecord>,
    /// `month_of_stop >= threshold`
    pub post: Vec<StopRecord>,
}

/// Split records by stop month, preserving order within each era
#[must_use]
pub fn split_eras(records: &[StopRecord], threshold: NaiveDate) -> Eras {
    let (pre, post): (Vec<StopRecord>, Vec<StopRecord>) = records
        .iter()
        .cloned()
        .partition(|r| r.month_of_stop < threshold);
    Eras { pre, post }
}

/// Remove every record with a missing value
#[must_use]
pub fn drop_missing(records: &[StopRecord]) -> Vec<StopRecord> {
    records.iter().filter(|r| !r.has_missing()).cloned().collect()
}

/// Disjoint train/test halves of one partition
#[derive(Debug, Clone, Default)]
pub struct TrainTestSplit {
    pub train: Vec<StopRecord>,
    pub test: Vec<StopRecord>,
}

/// Number of test rows for `n` records: `ceil(fraction * n)`
#[must_use]
pub fn test_size(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).ceil() as usize).min(n)
}

/// Shuffle with a seeded RNG and cut off the test rows
///
/// The same records, fraction and seed always give the same split.
#[must_use]
pub fn train_test_split(records: &[StopRecord], test_fraction: f64, seed: u64) -> TrainTestSplit {
    let mut order: Vec<usize> = (0..records.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let n_test = test_size(records.len(), test_fraction);
    let (test_idx, train_idx) = order.split_at(n_test);

    TrainTestSplit {
        train: train_idx.iter().map(|&i| records[i].clone()).collect(),
        test: test_idx.iter().map(|&i| records[i].clone()).collect(),
    }
}

/// Every exported partition of the cleaned table
#[derive(Debug, Clone, Default)]
pub struct Partitions {
    pub all: Vec<StopRecord>,
    pub all_trimmed: Vec<StopRecord>,
    pub pre: Vec<StopRecord>,
    pub pre_trimmed: Vec<StopRecord>,
    pub post: Vec<StopRecord>,
    pub post_trimmed: Vec<StopRecord>,
    pub split: TrainTestSplit,
}

/// Row counts per partition, for the cleaning summary
#[derive(Debug, Clone, Serialize)]
pub struct PartitionSize {
    pub name: &'static str,
    pub rows: usize,
}

impl Partitions {
    /// Build every partition; only the trimmed post-era set is split
    #[must_use]
    pub fn build(
        records: &[StopRecord],
        threshold: NaiveDate,
        test_fraction: f64,
        seed: u64,
    ) -> Self {
        let eras = split_eras(records, threshold);
        let post_trimmed = drop_missing(&eras.post);
        let split = train_test_split(&post_trimmed, test_fraction, seed);

        let partitions = Self {
            all: records.to_vec(),
            all_trimmed: drop_missing(records),
            pre_trimmed: drop_missing(&eras.pre),
            pre: eras.pre,
            post: eras.post,
            post_trimmed,
            split,
        };

        for size in partitions.sizes() {
            info!("Partition {}: {} rows", size.name, size.rows);
        }
        partitions
    }

    /// Partitions paired with their export file stem, in export order
    #[must_use]
    pub fn named(&self) -> [(&'static str, &[StopRecord]); 8] {
        [
            ("stops_all", &self.all),
            ("stops_all_trimmed", &self.all_trimmed),
            ("stops_2016", &self.pre),
            ("stops_2016_trimmed", &self.pre_trimmed),
            ("stops_2020", &self.post),
            ("stops_2020_trimmed", &self.post_trimmed),
            ("stops_2020_train", &self.split.train),
            ("stops_2020_test", &self.split.test),
        ]
    }

    #[must_use]
    pub fn sizes(&self) -> Vec<PartitionSize> {
        self.named()
            .into_iter()
            .map(|(name, records)| PartitionSize {
                name,
                rows: records.len(),
            })
            .collect()
    }
}
