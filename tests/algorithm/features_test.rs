use ndarray::{Array1, Array2};
use stop_analysis::algorithm::classify::{ModelSpec, Penalty};
use stop_analysis::algorithm::evaluation::Scorer;
use stop_analysis::algorithm::features::{
    FeatureMatrix, LabeledTable, ViewKind, build_view, chi2_scores, forward_select,
    mutual_info_scores,
};
use stop_analysis::models::{Target, columns};

use crate::utils::synthetic_records;

fn tables() -> (LabeledTable, LabeledTable) {
    let records = synthetic_records(90, 21);
    let (train, test) = records.split_at(60);
    (
        LabeledTable::from_records(train, Target::SearchConducted),
        LabeledTable::from_records(test, Target::SearchConducted),
    )
}

#[test]
fn test_normal_view_columns() {
    let (train, test) = tables();
    let view = build_view(ViewKind::Normal, &train, &test).unwrap();
    let names = view.x_train.names();

    assert_eq!(&names[..6], &[
        columns::OFFICER_GENDER,
        columns::OFFICER_YEARS_OF_SERVICE,
        columns::DRIVER_RACE,
        columns::DRIVER_ETHNICITY,
        columns::DRIVER_GENDER,
        columns::DRIVER_AGE,
    ]);
    assert!(view.x_train.contains("Reason_for_Stop_Investigation"));
    assert!(view.x_train.contains("Officer_Race_White"));
    assert_eq!(view.x_train.names(), view.x_test.names());
    assert_eq!(view.x_train.nrows(), 60);
    assert_eq!(view.x_test.nrows(), 30);
}

#[test]
fn test_contrast_view_drops_race_and_gender() {
    let (train, test) = tables();
    let view = build_view(ViewKind::Contrast, &train, &test).unwrap();
    for name in view.x_train.names() {
        assert!(!name.starts_with(columns::DRIVER_RACE), "{name}");
        assert!(!name.starts_with(columns::OFFICER_RACE), "{name}");
        assert!(!name.starts_with(columns::DRIVER_GENDER), "{name}");
        assert!(!name.starts_with(columns::OFFICER_GENDER), "{name}");
    }
    assert!(view.x_train.contains(columns::GENDER_MATCH));
    let matches = view.x_train.column(columns::GENDER_MATCH).unwrap();
    assert!(matches.iter().all(|&v| v == 0.0 || v == 1.0));
}

#[test]
fn test_driver_race_is_white_versus_non_white() {
    let (train, test) = tables();
    let view = build_view(ViewKind::Normal, &train, &test).unwrap();
    let codes = view.x_train.column(columns::DRIVER_RACE).unwrap();
    for (code, row) in codes.iter().zip(&train.rows) {
        let white = row.categorical(columns::DRIVER_RACE) == Some("White");
        assert_eq!(*code, if white { 0.0 } else { 1.0 });
    }
}

#[test]
fn test_view_subsets() {
    let (train, test) = tables();
    let view = build_view(ViewKind::Normal, &train, &test).unwrap();

    let without = view.without(&[columns::DRIVER_RACE]);
    assert!(!without.x_train.contains(columns::DRIVER_RACE));
    assert_eq!(without.x_train.ncols(), view.x_train.ncols() - 1);

    let only = view.only(&[columns::DRIVER_AGE, columns::DRIVER_RACE]).unwrap();
    assert_eq!(only.x_test.ncols(), 2);
    assert!(view.only(&["No_Such_Column"]).is_err());
}

fn scored_matrix(order: &[usize]) -> FeatureMatrix {
    let names = ["informative", "noise", "constant"];
    let columns: [Vec<f64>; 3] = [
        (0..40).map(|i| if i < 20 { 1.0 } else { 0.0 }).collect(),
        (0..40).map(|i| (i % 3) as f64).collect(),
        vec![2.0; 40],
    ];
    let values = Array2::from_shape_fn((40, 3), |(r, c)| columns[order[c]][r]);
    FeatureMatrix::new(order.iter().map(|&i| names[i].to_string()).collect(), values).unwrap()
}

fn labels() -> Array1<usize> {
    Array1::from_iter((0..40).map(|i| usize::from(i < 20)))
}

#[test]
fn test_univariate_scores_ignore_column_position() {
    let y = labels();
    let a = chi2_scores(&scored_matrix(&[0, 1, 2]), &y);
    let b = chi2_scores(&scored_matrix(&[2, 0, 1]), &y);
    for name in ["informative", "noise", "constant"] {
        assert_eq!(a.score_of(name).unwrap().score, b.score_of(name).unwrap().score);
    }
    assert_eq!(a.score_of("constant").unwrap().score, 0.0);
    assert!(a.score_of("informative").unwrap().score > a.score_of("noise").unwrap().score);

    let mi_a = mutual_info_scores(&scored_matrix(&[0, 1, 2]), &y, 10);
    let mi_b = mutual_info_scores(&scored_matrix(&[1, 2, 0]), &y, 10);
    for name in ["informative", "noise", "constant"] {
        assert_eq!(mi_a.score_of(name).unwrap().score, mi_b.score_of(name).unwrap().score);
    }
}

#[test]
fn test_forward_selection_starts_with_informative_column() {
    let spec = ModelSpec::LogisticRegression {
        penalty: Penalty::L2,
        max_iter: 200,
    };
    let selection = forward_select(
        &spec,
        &scored_matrix(&[1, 2, 0]),
        &labels(),
        0.5,
        3,
        &Scorer::Accuracy,
    )
    .unwrap();
    assert_eq!(selection.selected, vec!["informative".to_string()]);
    assert_eq!(selection.steps.len(), 1);
    assert_eq!(selection.steps[0].added, "informative");
    assert_eq!(selection.steps[0].cv_score, 1.0);
}
