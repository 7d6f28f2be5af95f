//! Cleaning of traffic-stop extracts and fairness-aware classification
//! of search and arrest outcomes.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{CleaningConfig, ModelingConfig, PipelineConfig};
pub use error::{Result, StopAnalysisError};
pub use models::{ArrestLabel, Outcome, RawStopRow, StopRecord, Target};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Classifiers and evaluation
pub use algorithm::classify::{Classifier, ModelSpec};
pub use algorithm::evaluation::{PanelReport, run_panel};
pub use algorithm::features::{FeatureMatrix, ViewData, ViewKind, build_view};

// Stage entry points
pub use pipeline::{clean_rows, run_cleaning, run_experiments, run_validation};
