use stop_analysis::algorithm::classify::{
    Classifier, DemographicParityClassifier, MaxFeatures, ModelSpec, Penalty,
};
use stop_analysis::algorithm::evaluation::{
    PanelOutcome, StratifiedKFold, cross_val_score, evaluate, p_percent_score, run_panel,
};
use stop_analysis::algorithm::evaluation::Scorer;
use stop_analysis::algorithm::features::{LabeledTable, ViewData, ViewKind, build_view};
use stop_analysis::models::{Target, columns};

use crate::utils::synthetic_records;

fn view() -> ViewData {
    let records = synthetic_records(320, 17);
    let (train, test) = records.split_at(240);
    build_view(
        ViewKind::Normal,
        &LabeledTable::from_records(train, Target::SearchConducted),
        &LabeledTable::from_records(test, Target::SearchConducted),
    )
    .unwrap()
}

fn small_roster() -> Vec<ModelSpec> {
    vec![
        ModelSpec::LogisticRegression {
            penalty: Penalty::L2,
            max_iter: 300,
        },
        ModelSpec::GaussianNb {
            var_smoothing: 1e-9,
        },
        ModelSpec::DemographicParity {
            sensitive_column: columns::DRIVER_RACE.to_string(),
            covariance_threshold: 0.8,
            max_iter: 300,
        },
    ]
}

#[test]
fn test_every_model_kind_predicts_probabilities() {
    let data = view();
    let specs = [
        ModelSpec::LogisticRegression {
            penalty: Penalty::L1,
            max_iter: 200,
        },
        ModelSpec::GradientBoosting {
            n_estimators: 20,
            learning_rate: 0.1,
            max_depth: 3,
        },
        ModelSpec::RandomForest {
            n_estimators: 10,
            max_features: MaxFeatures::Sqrt,
            max_depth: Some(5),
            seed: 0,
        },
        ModelSpec::KNearestNeighbors { k: 5 },
        ModelSpec::GaussianNb {
            var_smoothing: 1e-9,
        },
    ];
    for spec in &specs {
        let mut model = spec.build();
        model.fit(&data.x_train, &data.t_train).unwrap();
        let proba = model.predict_proba(&data.x_test).unwrap();
        assert_eq!(proba.len(), data.x_test.nrows(), "{spec}");
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)), "{spec}");
        let predicted = model.predict(&data.x_test).unwrap();
        assert!(predicted.iter().all(|&c| c <= 1), "{spec}");
    }
}

#[test]
fn test_logistic_regression_learns_investigation_signal() {
    let data = view();
    let spec = ModelSpec::LogisticRegression {
        penalty: Penalty::L2,
        max_iter: 500,
    };
    let (_, evaluation) = evaluate(&spec, &data).unwrap();
    assert!(evaluation.test_accuracy > 0.75, "{evaluation}");
    assert_eq!(evaluation.confusion.total(), data.x_test.nrows());
}

#[test]
fn test_prediction_requires_fitted_columns() {
    let data = view();
    let mut model = ModelSpec::GaussianNb {
        var_smoothing: 1e-9,
    }
    .build();
    model.fit(&data.x_train, &data.t_train).unwrap();
    let narrowed = data.without(&[columns::DRIVER_AGE]);
    assert!(model.predict(&narrowed.x_test).is_err());
}

#[test]
fn test_fair_classifier_bounds_decision_covariance() {
    let data = view();
    let mut model = DemographicParityClassifier::new(columns::DRIVER_RACE.to_string(), 0.01, 300);
    model.fit(&data.x_train, &data.t_train).unwrap();
    let covariance = model.decision_covariance(&data.x_train).unwrap();
    assert!(covariance.abs() <= 0.01 + 1e-6, "covariance {covariance}");

    let score = p_percent_score(&model, &data.x_test, columns::DRIVER_RACE).unwrap();
    assert!((0.0..=1.0).contains(&score));
}

#[test]
fn test_panel_keeps_roster_order() {
    let data = view();
    let report = run_panel("baseline", &small_roster(), &data);
    let names: Vec<&str> = report.entries.iter().map(|e| e.model.as_str()).collect();
    assert_eq!(names, vec![
        "Logistic Reg",
        "GaussianNB",
        "DemographicParityClassifier"
    ]);
    assert_eq!(report.evaluated().count(), 3);
    assert_eq!(report.features, data.x_train.names());
}

#[test]
fn test_panel_skips_fair_classifier_without_sensitive_column() {
    let data = view().without(&[columns::DRIVER_RACE]);
    let report = run_panel("race_ablation", &small_roster(), &data);

    let fair = report.entry("DemographicParityClassifier").unwrap();
    assert!(matches!(fair.outcome, PanelOutcome::Skipped { .. }));
    assert!(matches!(
        report.entry("Logistic Reg").unwrap().outcome,
        PanelOutcome::Evaluated(_)
    ));
    assert_eq!(report.evaluated().count(), 2);
}

#[test]
fn test_cross_validation_scores_each_fold() {
    let data = view();
    let folds = StratifiedKFold::new(&data.t_train, 3).unwrap();
    let spec = ModelSpec::GaussianNb {
        var_smoothing: 1e-9,
    };
    let scores = cross_val_score(&spec, &data.x_train, &data.t_train, &folds, &Scorer::Recall).unwrap();
    assert_eq!(scores.len(), 3);
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
}
