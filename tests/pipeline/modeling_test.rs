use std::path::Path;

use stop_analysis::algorithm::evaluation::PanelOutcome;
use stop_analysis::config::{ModelingConfig, linspace};
use stop_analysis::pipeline::modeling::{run_experiments_on, training_table};
use stop_analysis::pipeline::{run_cleaning, run_experiments};

use crate::utils::{cleaning_config, synthetic_records, write_extracts};

/// Every experiment enabled but kept small
fn quick_config(output_dir: &Path) -> ModelingConfig {
    ModelingConfig {
        output_dir: output_dir.to_path_buf(),
        random_search_iter: 3,
        run_grid_search: false,
        sweep_thresholds: linspace(0.05, 1.0, 3),
        logistic_max_iter: 200,
        ..ModelingConfig::default()
    }
}

#[test]
fn test_training_table_is_balanced_when_upsampling() {
    let records = synthetic_records(150, 2);
    let table = training_table(&records, &quick_config(Path::new("unused"))).unwrap();
    let [negative, positive] = table.class_counts();
    assert_eq!(negative, positive);

    let plain = ModelingConfig {
        upsample: false,
        ..quick_config(Path::new("unused"))
    };
    assert_eq!(training_table(&records, &plain).unwrap().len(), 150);
}

#[test]
fn test_unknown_target_is_rejected() {
    let records = synthetic_records(20, 2);
    let config = ModelingConfig {
        target: "Driver_Age".to_string(),
        ..quick_config(Path::new("unused"))
    };
    assert!(training_table(&records, &config).is_err());
}

#[test]
fn test_experiments_cover_every_variant() {
    let dir = tempfile::tempdir().unwrap();
    let records = synthetic_records(200, 8);
    let (train, test) = records.split_at(150);
    let config = quick_config(dir.path());

    let report = run_experiments_on(train, test, &config).unwrap();
    let variants: Vec<&str> = report.panels.iter().map(|p| p.variant.as_str()).collect();
    assert_eq!(variants, vec![
        "baseline",
        "contrast",
        "race_ablation",
        "manual_selection",
        "chi2_selection",
        "mutual_info_selection",
        "sequential_selection",
    ]);

    let baseline = &report.panels[0];
    assert_eq!(baseline.entries.len(), 6);
    assert!(baseline.entries.iter().all(|e| matches!(e.outcome, PanelOutcome::Evaluated(_))));

    let ablation = &report.panels[2];
    assert!(matches!(
        ablation.entry("DemographicParityClassifier").unwrap().outcome,
        PanelOutcome::Skipped { .. }
    ));

    assert_eq!(report.test_rows, 50);
    assert!(report.coefficients.is_some());
    assert!(report.gradient_boosting_p_percent.is_some());
    assert_eq!(report.univariate_scores.len(), 2);
    assert!(report.grid_search.is_none());
    assert_eq!(report.random_search.as_ref().unwrap().candidates.len(), 3);

    let sweep = report.fairness_sweep.as_ref().unwrap();
    assert_eq!(sweep.points.len(), 3);
    assert!(dir.path().join("fairness_sweep.csv").exists());
}

#[test]
fn test_disabled_steps_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let records = synthetic_records(120, 4);
    let (train, test) = records.split_at(90);
    let config = ModelingConfig {
        run_contrast: false,
        run_race_ablation: false,
        run_feature_selection: false,
        run_sequential_selection: false,
        run_random_search: false,
        run_fairness_sweep: false,
        ..quick_config(dir.path())
    };

    let report = run_experiments_on(train, test, &config).unwrap();
    assert_eq!(report.panels.len(), 1);
    assert!(report.univariate_scores.is_empty());
    assert!(report.sequential_selection.is_none());
    assert!(report.random_search.is_none());
    assert!(report.fairness_sweep.is_none());
}

#[test]
fn test_stages_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_extracts(dir.path(), 150);
    let cleaning = cleaning_config(dir.path());
    let cleaned = run_cleaning(&cleaning).unwrap();
    assert!(!cleaned.partitions.split.train.is_empty());

    let modeling = ModelingConfig {
        train_path: cleaning.output_dir.join("stops_2020_train.csv"),
        test_path: cleaning.output_dir.join("stops_2020_test.csv"),
        run_contrast: false,
        run_feature_selection: false,
        run_sequential_selection: false,
        run_random_search: false,
        ..quick_config(&dir.path().join("results"))
    };
    let report = run_experiments(&modeling).unwrap();
    assert_eq!(report.test_rows, cleaned.partitions.split.test.len());

    let written = std::fs::read_to_string(dir.path().join("results/experiment_report.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed["panels"].as_array().unwrap().len(), report.panels.len());
    assert_eq!(parsed["target"], "Was_a_Search_Conducted");
    assert_eq!(parsed["panels"][0]["entries"][0]["outcome"]["status"], "evaluated");
}
