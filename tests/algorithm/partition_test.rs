use std::collections::HashSet;

use chrono::NaiveDate;
use stop_analysis::algorithm::features::LabeledTable;
use stop_analysis::algorithm::partition::{Partitions, test_size, train_test_split};
use stop_analysis::algorithm::upsample::{SmoteNc, upsample};
use stop_analysis::algorithm::features::table::CATEGORICAL_COLUMNS;
use stop_analysis::models::columns;

use crate::utils::{record, synthetic_records};

fn threshold() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()
}

#[test]
fn test_split_is_disjoint_and_covers_trimmed_post_era() {
    let mut records = synthetic_records(80, 3);
    for r in records.iter_mut().take(20) {
        r.month_of_stop = NaiveDate::from_ymd_opt(2016, 6, 1).unwrap();
    }
    records[30].cmpd_division = None;
    records[31].cmpd_division = None;

    let partitions = Partitions::build(&records, threshold(), 0.25, 101);
    assert_eq!(partitions.pre.len(), 20);
    assert_eq!(partitions.post.len(), 60);
    assert_eq!(partitions.post_trimmed.len(), 58);
    assert_eq!(partitions.all_trimmed.len(), 78);

    let train: HashSet<u64> = partitions.split.train.iter().map(|r| r.record_id).collect();
    let test: HashSet<u64> = partitions.split.test.iter().map(|r| r.record_id).collect();
    assert!(train.is_disjoint(&test));
    assert_eq!(test.len(), test_size(58, 0.25));
    let covered: HashSet<u64> = train.union(&test).copied().collect();
    let trimmed: HashSet<u64> = partitions.post_trimmed.iter().map(|r| r.record_id).collect();
    assert_eq!(covered, trimmed);
}

#[test]
fn test_split_is_reproducible_per_seed() {
    let records = synthetic_records(50, 9);
    let ids = |seed| {
        train_test_split(&records, 0.25, seed)
            .test
            .iter()
            .map(|r| r.record_id)
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(101), ids(101));
    assert_ne!(ids(101), ids(102));
}

#[test]
fn test_upsample_balances_classes() {
    let records = synthetic_records(120, 5);
    let table = upsample(&records, columns::WAS_A_SEARCH_CONDUCTED, &SmoteNc::new(5, 42)).unwrap();
    let [negative, positive] = table.class_counts();
    assert_eq!(negative, positive);
    assert_eq!(table.len(), 2 * negative);
}

#[test]
fn test_upsampled_categoricals_were_observed() {
    let records = synthetic_records(120, 11);
    let original = LabeledTable::from_records(&records, stop_analysis::Target::SearchConducted);
    let table = SmoteNc::new(5, 42).resample(&original);

    for (c, column) in CATEGORICAL_COLUMNS.iter().enumerate() {
        let observed: HashSet<&str> = original.rows.iter().map(|r| r.categorical[c].as_str()).collect();
        for row in &table.rows {
            assert!(
                observed.contains(row.categorical[c].as_str()),
                "{column} value '{}' was never observed",
                row.categorical[c]
            );
        }
    }
}

#[test]
fn test_upsample_unknown_target_is_none() {
    let records = vec![record(0, true), record(1, false)];
    assert!(upsample(&records, "Driver_Age", &SmoteNc::new(5, 1)).is_none());
}
