//! Feature engineering for the modeling stage.

pub mod matrix;
pub mod scaling;
pub mod selection;
pub mod sequential;
pub mod table;
pub mod views;

pub use matrix::FeatureMatrix;
pub use scaling::{MinMaxScaler, Standardizer};
pub use selection::{FeatureScore, ScoreMethod, ScoreTable, chi2_scores, mutual_info_scores};
pub use sequential::{SequentialSelection, forward_select};
pub use table::{LabeledTable, StopFeatures};
pub use views::{FeatureView, ViewData, ViewKind, build_view};
