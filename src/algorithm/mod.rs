//! Algorithm implementations for the two analysis stages
//!
//! Cleaning and partitioning of stop records, rebalancing, feature views,
//! the classifier roster and everything used to evaluate it.

pub mod classify;
pub mod cleaning;
pub mod evaluation;
pub mod features;
pub mod partition;
pub mod upsample;
