use proptest::prelude::*;
use stop_analysis::algorithm::cleaning::encoding::BINARY_ENCODINGS;
use stop_analysis::algorithm::cleaning::bucket_officer_race;
use stop_analysis::config::CleaningConfig;
use stop_analysis::models::{ArrestLabel, Outcome};
use stop_analysis::pipeline::clean_rows;

use crate::utils::{RESULTS, raw_row};

const DRIVER_RACES: [&str; 5] = ["Asian", "Black", "Native American", "Other/Unknown", "White"];

proptest! {
    #[test]
    fn arrest_text_always_wins(prefix in "[a-zA-Z ]{0,12}", suffix in "[a-zA-Z ]{0,12}") {
        let text = format!("{prefix}Arrest{suffix}");
        prop_assert_eq!(Outcome::from_result_text(&text), Outcome::Arrest);
        prop_assert_eq!(ArrestLabel::from_result_text(&text), ArrestLabel::Arrest);
    }

    #[test]
    fn outcome_is_one_of_three(text in "\\PC{0,30}") {
        let outcome = Outcome::from_result_text(&text);
        let expected = if text.contains("Arrest") {
            Outcome::Arrest
        } else if text.contains("Citation Issued") {
            Outcome::Citation
        } else {
            Outcome::WarningOrNoAction
        };
        prop_assert_eq!(outcome, expected);
        prop_assert_eq!(outcome == Outcome::Arrest, ArrestLabel::from_result_text(&text) == ArrestLabel::Arrest);
    }

    #[test]
    fn officer_race_lands_in_driver_vocabulary(text in "\\PC{0,40}") {
        prop_assert!(DRIVER_RACES.contains(&bucket_officer_race(&text)));
    }

    #[test]
    fn binary_codes_decode_to_their_label(index in 0usize..4, code in 0u8..2) {
        let encoding = BINARY_ENCODINGS[index];
        let label = encoding.decode(code).unwrap();
        prop_assert_eq!(encoding.encode(label), Some(code));
    }

    #[test]
    fn cleaning_is_deterministic(seeds in prop::collection::vec(0usize..1000, 1..25)) {
        let rows: Vec<_> = seeds
            .iter()
            .map(|&i| raw_row(i, "2020/06", &(18 + i % 60).to_string()))
            .collect();
        let config = CleaningConfig::default();
        let first = clean_rows(&rows, &config).unwrap();
        let second = clean_rows(&rows, &config).unwrap();
        prop_assert_eq!(&first.records, &second.records);
        prop_assert_eq!(first.records.len(), rows.len());
        for (record, i) in first.records.iter().zip(&seeds) {
            prop_assert_eq!(&record.result_of_stop, RESULTS[i % RESULTS.len()]);
        }
    }
}
