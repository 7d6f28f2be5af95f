//! Log lines shared by both pipeline stages.

use std::path::Path;
use std::time::Duration;

use log::{info, warn};

/// `"<action> <path>"` at info level
pub fn log_operation_start(action: &str, path: &Path) {
    info!("{action} {}", path.display());
}

/// One line per finished file or stage: verb, row count, location and timing
pub fn log_operation_complete(verb: &str, path: &Path, rows: usize, elapsed: Option<Duration>) {
    match elapsed {
        Some(d) => info!("{verb} {rows} rows at {} in {d:.2?}", path.display()),
        None => info!("{verb} {rows} rows at {}", path.display()),
    }
}

/// A skipped or degraded step, with the file involved if there is one
pub fn log_warning(message: &str, path: Option<&Path>) {
    match path {
        Some(p) => warn!("{message} ({})", p.display()),
        None => warn!("{message}"),
    }
}

/// A rendered report (table, chart, confusion matrix) under a heading,
/// one indented log line per text line
pub fn log_block(title: &str, block: &str) {
    info!("{title}:");
    block.lines().for_each(|line| info!("    {line}"));
}
