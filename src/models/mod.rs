//! Data models for traffic-stop records.

pub mod rows;
pub mod stop;

pub use rows::{RawStopRow, StopRow};
pub use stop::{ArrestLabel, Outcome, StopRecord, Target, columns};
