//! Scoring, cross-validation, panel runs, searches and fairness sweeps.

pub mod cv;
pub mod fairness;
pub mod metrics;
pub mod panel;
pub mod search;

pub use cv::{Scorer, StratifiedKFold, cross_val_score, cross_validate};
pub use fairness::{FairnessSweep, demographic_parity_difference, fairness_sweep, p_percent_score};
pub use metrics::{ClassificationReport, ConfusionMatrix, accuracy, matthews_corrcoef, recall};
pub use panel::{Evaluation, PanelEntry, PanelOutcome, PanelReport, evaluate, run_panel};
pub use search::{SearchResult, grid_candidates, random_candidates, run_search};
