//! Stage 2: rebalance, build feature views and run every experiment.

use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::algorithm::classify::{
    Classifier, CoefficientReport, LogisticRegression, ModelSpec, Penalty,
};
use crate::algorithm::evaluation::{
    FairnessSweep, PanelOutcome, PanelReport, Scorer, SearchResult, StratifiedKFold, evaluate,
    fairness_sweep, grid_candidates, p_percent_score, random_candidates, run_panel, run_search,
};
use crate::algorithm::features::{
    LabeledTable, ScoreTable, SequentialSelection, ViewData, ViewKind, build_view, chi2_scores,
    forward_select, mutual_info_scores,
};
use crate::algorithm::upsample::{SmoteNc, upsample};
use crate::config::ModelingConfig;
use crate::error::{Result, StopAnalysisError};
use crate::loader::load_records;
use crate::models::{StopRecord, Target};
use crate::pipeline::write_json_report;
use crate::utils::logging::{log_block, log_operation_complete, log_operation_start, log_warning};

pub const EXPERIMENT_REPORT: &str = "experiment_report.json";
pub const FAIRNESS_SWEEP_CSV: &str = "fairness_sweep.csv";

/// Everything stage 2 measured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub target: String,
    pub upsampled: bool,
    /// Class counts (0, 1) of the training table the models saw
    pub train_class_counts: [usize; 2],
    pub test_rows: usize,
    pub panels: Vec<PanelReport>,
    pub coefficients: Option<CoefficientReport>,
    /// p% score of gradient boosting on its own training set
    pub gradient_boosting_p_percent: Option<f64>,
    pub univariate_scores: Vec<ScoreTable>,
    pub sequential_selection: Option<SequentialSelection>,
    pub grid_search: Option<SearchResult>,
    pub random_search: Option<SearchResult>,
    pub fairness_sweep: Option<FairnessSweep>,
}

/// Log a failed optional step and carry on without its result
fn attempt<T>(step: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log_warning(&format!("{step} failed: {e}"), None);
            None
        }
    }
}

/// Training table for `config.target`, rebalanced when configured
pub fn training_table(train: &[StopRecord], config: &ModelingConfig) -> Result<LabeledTable> {
    let table = if config.upsample {
        upsample(
            train,
            &config.target,
            &SmoteNc::new(config.smote_neighbors, config.smote_seed),
        )
    } else {
        Target::from_column_name(&config.target).map(|t| LabeledTable::from_records(train, t))
    };
    let table = table.ok_or_else(|| StopAnalysisError::MissingTarget(config.target.clone()))?;
    let [negative, positive] = table.class_counts();
    info!(
        "Training table for {}: {} rows ({negative} negative, {positive} positive)",
        config.target,
        table.len()
    );
    Ok(table)
}

fn coefficient_report(data: &ViewData, config: &ModelingConfig) -> Result<CoefficientReport> {
    let mut model = LogisticRegression::new(Penalty::L2, config.logistic_max_iter);
    model.fit(&data.x_train, &data.t_train)?;
    let report = model.coefficients()?;
    log_block("Logistic regression coefficients", &report.to_string());
    Ok(report)
}

fn gradient_boosting_p_percent(data: &ViewData, config: &ModelingConfig) -> Result<f64> {
    let spec = ModelSpec::panel(config)
        .into_iter()
        .find(|s| matches!(s, ModelSpec::GradientBoosting { .. }))
        .ok_or_else(|| StopAnalysisError::model("roster has no gradient boosting model"))?;
    let (model, _) = evaluate(&spec, data)?;
    let score = p_percent_score(model.as_ref(), &data.x_train, &config.sensitive_column)?;
    info!(
        "{}> p% score on {} (training set): {score:.4}",
        spec.name(),
        config.sensitive_column
    );
    Ok(score)
}

/// Manual, chi-squared and mutual-information selections, each run through the panel
fn feature_selection_panels(
    data: &ViewData,
    roster: &[ModelSpec],
    config: &ModelingConfig,
) -> (Vec<PanelReport>, Vec<ScoreTable>) {
    let mut panels = vec![run_panel(
        "manual_selection",
        roster,
        &data.without(config.manual_drop_columns.as_slice()),
    )];

    let tables = vec![
        chi2_scores(&data.x_train, &data.t_train),
        mutual_info_scores(&data.x_train, &data.t_train, config.mutual_info_bins),
    ];
    for (variant, table) in ["chi2_selection", "mutual_info_selection"].iter().zip(&tables) {
        log_block(&format!("{} scores", table.method), &table.bar_chart(40));
        let kept = table.kept(config.univariate_cut);
        info!("{variant}: keeping {} of {} columns", kept.len(), table.scores.len());
        if let Some(selected) = attempt(variant, data.only(kept.as_slice())) {
            panels.push(run_panel(variant, roster, &selected));
        }
    }
    (panels, tables)
}

fn sequential_selection_panel(
    data: &ViewData,
    roster: &[ModelSpec],
    config: &ModelingConfig,
) -> Result<(SequentialSelection, PanelReport)> {
    let spec = ModelSpec::LogisticRegression {
        penalty: Penalty::L2,
        max_iter: config.logistic_max_iter,
    };
    let selection = forward_select(
        &spec,
        &data.x_train,
        &data.t_train,
        config.sfs_fraction,
        config.cv_folds,
        &Scorer::Recall,
    )?;
    info!("Forward selection kept: {}", selection.selected.join(", "));
    let selected = data.only(selection.selected.as_slice())?;
    let panel = run_panel("sequential_selection", roster, &selected);
    Ok((selection, panel))
}

fn sweep(data: &ViewData, config: &ModelingConfig) -> Result<FairnessSweep> {
    let folds = StratifiedKFold::new(&data.t_train, config.cv_folds)?;
    let sweep = fairness_sweep(
        &data.x_train,
        &data.t_train,
        &config.sensitive_column,
        &config.sweep_thresholds,
        config.logistic_max_iter,
        &folds,
    )?;
    log_block("Fairness sweep", &sweep.to_string());
    sweep.write_csv(&config.output_dir.join(FAIRNESS_SWEEP_CSV))?;
    Ok(sweep)
}

/// Run every configured experiment on already-loaded train/test records
pub fn run_experiments_on(
    train: &[StopRecord],
    test: &[StopRecord],
    config: &ModelingConfig,
) -> Result<ExperimentReport> {
    let target = Target::from_column_name(&config.target)
        .ok_or_else(|| StopAnalysisError::MissingTarget(config.target.clone()))?;
    let train_table = training_table(train, config)?;
    let test_table = LabeledTable::from_records(test, target);

    let roster = ModelSpec::panel(config);
    let normal = build_view(ViewKind::Normal, &train_table, &test_table)?;
    let mut panels = vec![run_panel("baseline", &roster, &normal)];

    if config.run_contrast {
        if let Some(contrast) = attempt(
            "contrast view",
            build_view(ViewKind::Contrast, &train_table, &test_table),
        ) {
            panels.push(run_panel("contrast", &roster, &contrast));
        }
    }
    if config.run_race_ablation {
        panels.push(run_panel(
            "race_ablation",
            &roster,
            &normal.without(&[config.sensitive_column.as_str()]),
        ));
    }

    let coefficients = attempt("coefficient report", coefficient_report(&normal, config));
    let gradient_boosting_p_percent =
        attempt("gradient boosting p% score", gradient_boosting_p_percent(&normal, config));

    let mut univariate_scores = Vec::new();
    if config.run_feature_selection {
        let (selection_panels, tables) = feature_selection_panels(&normal, &roster, config);
        panels.extend(selection_panels);
        univariate_scores = tables;
    }

    let mut sequential_selection = None;
    if config.run_sequential_selection {
        if let Some((selection, panel)) = attempt(
            "sequential selection",
            sequential_selection_panel(&normal, &roster, config),
        ) {
            sequential_selection = Some(selection);
            panels.push(panel);
        }
    }

    let grid_search = config
        .run_grid_search
        .then(|| {
            attempt(
                "grid search",
                run_search(
                    "grid",
                    &grid_candidates(config),
                    &normal,
                    config.cv_folds,
                    &Scorer::Recall,
                ),
            )
        })
        .flatten();
    let random_search = config
        .run_random_search
        .then(|| {
            let candidates =
                random_candidates(config, config.random_search_iter, config.search_seed);
            attempt(
                "random search",
                run_search("random", &candidates, &normal, config.cv_folds, &Scorer::Recall),
            )
        })
        .flatten();

    let fairness_sweep = config
        .run_fairness_sweep
        .then(|| attempt("fairness sweep", sweep(&normal, config)))
        .flatten();

    Ok(ExperimentReport {
        target: config.target.clone(),
        upsampled: config.upsample,
        train_class_counts: train_table.class_counts(),
        test_rows: test_table.len(),
        panels,
        coefficients,
        gradient_boosting_p_percent,
        univariate_scores,
        sequential_selection,
        grid_search,
        random_search,
        fairness_sweep,
    })
}

/// Stage 2 end to end: load the exported split, run experiments, write results
pub fn run_experiments(config: &ModelingConfig) -> Result<ExperimentReport> {
    let start = Instant::now();
    log_operation_start("Running experiments, writing results to", &config.output_dir);

    let train = load_records(&config.train_path)?;
    let test = load_records(&config.test_path)?;
    if train.is_empty() || test.is_empty() {
        return Err(StopAnalysisError::model(format!(
            "empty split: {} training and {} test records",
            train.len(),
            test.len()
        )));
    }

    let report = run_experiments_on(&train, &test, config)?;
    write_json_report(&config.output_dir.join(EXPERIMENT_REPORT), &report)?;

    let failures = report
        .panels
        .iter()
        .flat_map(|p| &p.entries)
        .filter(|e| matches!(e.outcome, PanelOutcome::Failed { .. }))
        .count();
    if failures > 0 {
        warn!("{failures} model runs failed; see {EXPERIMENT_REPORT}");
    }

    log_operation_complete(
        "modeled",
        &config.output_dir,
        train.len() + test.len(),
        Some(start.elapsed()),
    );
    Ok(report)
}
