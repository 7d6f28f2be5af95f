//! Allow-list validation of categorical columns.
//!
//! Enumerates the distinct values observed in each allow-listed column and
//! marks the ones that fall outside the list. Nothing is corrected here; the
//! report is for an operator to review.

use std::fmt;

use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::AllowLists;
use crate::error::{Result, StopAnalysisError};
use crate::models::RawStopRow;

/// Pseudo-value used for missing cells in the report
pub const MISSING_VALUE: &str = "<missing>";

/// One distinct value observed in a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedValue {
    pub value: String,
    pub count: usize,
    pub allowed: bool,
}

/// Observed values of one categorical column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnValidation {
    pub column: String,
    pub nullable: bool,
    /// Sorted by value
    pub observed: Vec<ObservedValue>,
}

impl ColumnValidation {
    /// Values outside the allow-list
    pub fn flagged(&self) -> impl Iterator<Item = &ObservedValue> {
        self.observed.iter().filter(|v| !v.allowed)
    }
}

/// Result of validating all allow-listed columns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub rows: usize,
    pub columns: Vec<ColumnValidation>,
}

impl ValidationReport {
    /// True when every observed value is allowed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.columns.iter().all(|c| c.flagged().next().is_none())
    }

    /// (column, value, count) for every flagged value
    #[must_use]
    pub fn flagged(&self) -> Vec<(String, String, usize)> {
        self.columns
            .iter()
            .flat_map(|c| {
                c.flagged()
                    .map(|v| (c.column.clone(), v.value.clone(), v.count))
            })
            .collect()
    }

    /// Convert flagged values into a schema error
    pub fn ensure_clean(&self) -> Result<()> {
        if self.is_clean() {
            return Ok(());
        }
        let problems = self
            .columns
            .iter()
            .filter(|c| c.flagged().next().is_some())
            .map(|c| {
                format!(
                    "{}: {}",
                    c.column,
                    c.flagged()
                        .map(|v| format!("'{}' x{}", v.value, v.count))
                        .join(", ")
                )
            })
            .collect();
        Err(StopAnalysisError::UnexpectedValues(problems))
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Categorical validation over {} rows:", self.rows)?;
        for column in &self.columns {
            writeln!(f, "  {} ({} distinct)", column.column, column.observed.len())?;
            for value in &column.observed {
                let mark = if value.allowed { "ok" } else { "UNEXPECTED" };
                writeln!(f, "    {:<40} {:>8}  {mark}", value.value, value.count)?;
            }
        }
        Ok(())
    }
}

/// Count the distinct values of every allow-listed column
#[must_use]
pub fn validate_categoricals(rows: &[RawStopRow], allow_lists: &AllowLists) -> ValidationReport {
    let columns = allow_lists
        .columns
        .keys()
        .map(|column| {
            let nullable = allow_lists.is_nullable(column);
            let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
            for row in rows {
                let value = row.get(column).unwrap_or(MISSING_VALUE);
                *counts.entry(value).or_insert(0) += 1;
            }

            let observed = counts
                .into_iter()
                .sorted_by(|a, b| a.0.cmp(b.0))
                .map(|(value, count)| ObservedValue {
                    allowed: if value == MISSING_VALUE {
                        nullable
                    } else {
                        allow_lists.accepts(column, value)
                    },
                    value: value.to_string(),
                    count,
                })
                .collect();

            ColumnValidation {
                column: column.clone(),
                nullable,
                observed,
            }
        })
        .collect();

    ValidationReport {
        rows: rows.len(),
        columns,
    }
}
