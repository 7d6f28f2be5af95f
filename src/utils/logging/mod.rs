//! Log lines and progress bars

pub mod log;
pub mod progress;

pub use self::log::{log_block, log_operation_complete, log_operation_start, log_warning};
pub use self::progress::{finish_fit_progress, fit_progress_bar};
