//! Progress bars for cross-validated searches and sweeps.

use indicatif::{ProgressBar, ProgressStyle};

/// Step name, elapsed time, bar, finished/total fits and estimated time left
pub const FIT_TEMPLATE: &str =
    "{spinner:.green} {prefix:.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} fits (eta {eta}) {msg}";

/// A bar counting the `fits` candidate fits of one step
#[must_use]
pub fn fit_progress_bar(fits: u64, step: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(FIT_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let pb = ProgressBar::new(fits).with_style(style);
    pb.set_prefix(step.to_string());
    pb
}

/// Leave the bar in place with a one-line summary of the step
pub fn finish_fit_progress(pb: &ProgressBar, summary: &str) {
    pb.finish_with_message(summary.to_string());
}
