//! Fit-and-score runs of the classifier roster on one feature view.

use std::fmt;

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithm::classify::{Classifier, ModelSpec};
use crate::algorithm::evaluation::metrics::{ClassificationReport, ConfusionMatrix, accuracy};
use crate::algorithm::features::{ViewData, ViewKind};
use crate::error::{Result, StopAnalysisError};
use crate::utils::logging::log_block;

/// Scores of one fitted classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub mcc: f64,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Train Accuracy: {:.4}, Test Accuracy: {:.4}, MCC: {:.4}",
            self.train_accuracy, self.test_accuracy, self.mcc
        )?;
        write!(f, "{}", self.report)?;
        write!(f, "{}", self.confusion.render())
    }
}

/// Fit `spec` on the training half of `data` and score it on both halves
///
/// Returns the fitted model alongside its scores so callers can inspect it
/// further (coefficients, fairness scores).
pub fn evaluate(spec: &ModelSpec, data: &ViewData) -> Result<(Box<dyn Classifier>, Evaluation)> {
    let mut model = spec.build();
    model.check_compatible(&data.x_train)?;
    model.fit(&data.x_train, &data.t_train)?;

    let train_pred = model.predict(&data.x_train)?;
    let test_pred = model.predict(&data.x_test)?;
    let confusion = ConfusionMatrix::from_labels(&data.t_test, &test_pred);
    let evaluation = Evaluation {
        train_accuracy: accuracy(&data.t_train, &train_pred),
        test_accuracy: confusion.accuracy(),
        mcc: confusion.mcc(),
        report: ClassificationReport::from_confusion(&confusion),
        confusion,
    };
    Ok((model, evaluation))
}

/// What happened to one classifier in a panel run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelOutcome {
    Evaluated(Evaluation),
    /// The feature matrix lacks something the model needs
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelEntry {
    pub model: String,
    pub spec: ModelSpec,
    pub outcome: PanelOutcome,
}

/// All roster results for one variant (baseline, contrast, ablation, selection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelReport {
    pub variant: String,
    pub view: ViewKind,
    pub features: Vec<String>,
    pub entries: Vec<PanelEntry>,
}

impl PanelReport {
    /// Entry of a model by display name
    #[must_use]
    pub fn entry(&self, model: &str) -> Option<&PanelEntry> {
        self.entries.iter().find(|e| e.model == model)
    }

    #[must_use]
    pub fn evaluated(&self) -> impl Iterator<Item = (&str, &Evaluation)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            PanelOutcome::Evaluated(ev) => Some((e.model.as_str(), ev)),
            _ => None,
        })
    }
}

/// Run every model of `specs` on `data`
///
/// Models run in parallel; results keep roster order. A model whose
/// features are incompatible is recorded as skipped, any other error as
/// failed, and the remaining models still run.
pub fn run_panel(variant: &str, specs: &[ModelSpec], data: &ViewData) -> PanelReport {
    info!(
        "Running {} classifiers on variant '{variant}' ({} view, {} features)",
        specs.len(),
        data.kind,
        data.x_train.ncols()
    );

    let entries: Vec<PanelEntry> = specs
        .par_iter()
        .map(|spec| {
            let outcome = match evaluate(spec, data) {
                Ok((_, evaluation)) => PanelOutcome::Evaluated(evaluation),
                Err(e @ StopAnalysisError::IncompatibleFeatures { .. }) => PanelOutcome::Skipped {
                    reason: e.to_string(),
                },
                Err(e) => PanelOutcome::Failed {
                    error: e.to_string(),
                },
            };
            PanelEntry {
                model: spec.name().to_string(),
                spec: spec.clone(),
                outcome,
            }
        })
        .collect();

    for entry in &entries {
        match &entry.outcome {
            PanelOutcome::Evaluated(evaluation) => {
                log_block(&format!("{}> [{variant}]", entry.model), &evaluation.to_string());
            }
            PanelOutcome::Skipped { reason } => {
                warn!("{}> skipped on '{variant}': {reason}", entry.model);
            }
            PanelOutcome::Failed { error } => {
                warn!("{}> failed on '{variant}': {error}", entry.model);
            }
        }
    }

    PanelReport {
        variant: variant.to_string(),
        view: data.kind,
        features: data.x_train.names().to_vec(),
        entries,
    }
}
