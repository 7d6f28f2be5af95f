//! Shared utilities: flat-file IO, logging and progress reporting.

pub mod io;
pub mod logging;

pub use io::{read_table, write_table};
