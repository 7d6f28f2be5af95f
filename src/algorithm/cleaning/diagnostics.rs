//! Diagnostic reports behind the cleaning decisions.
//!
//! Neither report changes data. The age diagnostic shows whether under-age
//! drivers are associated with the stop reason or result before they are
//! filtered; the missingness report compares rows with a missing division
//! against their whole partition.

use std::fmt;

use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::algorithm::cleaning::coercion::CoercedRow;
use crate::models::{StopRecord, columns};

/// Chi-squared test of independence on a contingency table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub chi_squared: f64,
    pub degrees_of_freedom: usize,
    /// `None` when the table is degenerate (a single row or column)
    pub p_value: Option<f64>,
    pub cramers_v: f64,
}

/// Pearson chi-squared test over a table of observed counts
///
/// Rows or columns whose total is zero are ignored.
#[must_use]
pub fn chi_squared_independence(table: &[Vec<f64>]) -> Association {
    let rows: Vec<&Vec<f64>> = table.iter().filter(|r| r.iter().sum::<f64>() > 0.0).collect();
    let width = rows.first().map_or(0, |r| r.len());
    let col_totals: Vec<f64> = (0..width)
        .map(|j| rows.iter().map(|r| r[j]).sum())
        .collect();
    let live_cols: Vec<usize> = (0..width).filter(|&j| col_totals[j] > 0.0).collect();
    let total: f64 = col_totals.iter().sum();

    if rows.len() < 2 || live_cols.len() < 2 || total == 0.0 {
        return Association {
            chi_squared: 0.0,
            degrees_of_freedom: 0,
            p_value: None,
            cramers_v: 0.0,
        };
    }

    let mut chi_squared = 0.0;
    for row in &rows {
        let row_total: f64 = row.iter().sum();
        for &j in &live_cols {
            let expected = row_total * col_totals[j] / total;
            chi_squared += (row[j] - expected).powi(2) / expected;
        }
    }

    let degrees_of_freedom = (rows.len() - 1) * (live_cols.len() - 1);
    let p_value = ChiSquared::new(degrees_of_freedom as f64)
        .ok()
        .map(|dist| dist.sf(chi_squared));
    let min_dim = (rows.len().min(live_cols.len()) - 1) as f64;
    let cramers_v = (chi_squared / (total * min_dim)).sqrt();

    Association {
        chi_squared,
        degrees_of_freedom,
        p_value,
        cramers_v,
    }
}

/// Share of one category among the flagged rows versus the population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub value: String,
    pub flagged_count: usize,
    pub flagged_share: f64,
    pub population_count: usize,
    pub population_share: f64,
}

/// A categorical field broken down for flagged rows and the population
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub column: String,
    pub shares: Vec<CategoryShare>,
    pub association: Association,
}

impl CategoryBreakdown {
    /// Build the breakdown from (value, flagged) pairs
    fn from_pairs<'a>(column: &str, pairs: impl Iterator<Item = (&'a str, bool)>) -> Self {
        let mut counts: FxHashMap<&str, (usize, usize)> = FxHashMap::default();
        for (value, flagged) in pairs {
            let entry = counts.entry(value).or_insert((0, 0));
            entry.1 += 1;
            if flagged {
                entry.0 += 1;
            }
        }

        let flagged_total: usize = counts.values().map(|c| c.0).sum();
        let population_total: usize = counts.values().map(|c| c.1).sum();
        let share = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 };

        let ordered: Vec<(&str, (usize, usize))> =
            counts.into_iter().sorted_by(|a, b| a.0.cmp(b.0)).collect();

        // 2 x k table: flagged rows against the rest
        let table = vec![
            ordered.iter().map(|(_, c)| c.0 as f64).collect::<Vec<_>>(),
            ordered.iter().map(|(_, c)| (c.1 - c.0) as f64).collect::<Vec<_>>(),
        ];

        let shares = ordered
            .iter()
            .map(|(value, (flagged, population))| CategoryShare {
                value: (*value).to_string(),
                flagged_count: *flagged,
                flagged_share: share(*flagged, flagged_total),
                population_count: *population,
                population_share: share(*population, population_total),
            })
            .collect();

        Self {
            column: column.to_string(),
            shares,
            association: chi_squared_independence(&table),
        }
    }
}

impl fmt::Display for CategoryBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<32} | {:>8} | {:>7} | {:>10} | {:>7}",
            self.column, "flagged", "share", "population", "share"
        )?;
        for s in &self.shares {
            writeln!(
                f,
                "{:<32} | {:>8} | {:>6.1}% | {:>10} | {:>6.1}%",
                s.value,
                s.flagged_count,
                100.0 * s.flagged_share,
                s.population_count,
                100.0 * s.population_share
            )?;
        }
        let p = self
            .association
            .p_value
            .map_or_else(|| "n/a".to_string(), |p| format!("{p:.4}"));
        writeln!(
            f,
            "chi2 = {:.3} (df {}), p = {p}, Cramer's V = {:.4}",
            self.association.chi_squared,
            self.association.degrees_of_freedom,
            self.association.cramers_v
        )
    }
}

/// Under-age drivers compared with everyone else
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeDiagnostic {
    /// Rows with `driver_age < min_age` are flagged
    pub min_age: f64,
    pub flagged_rows: usize,
    pub total_rows: usize,
    /// Distinct ages among the flagged rows, ascending
    pub flagged_ages: Vec<f64>,
    pub by_reason: CategoryBreakdown,
    pub by_result: CategoryBreakdown,
}

impl fmt::Display for AgeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} of {} rows have driver age below {} (ages: {:?})",
            self.flagged_rows, self.total_rows, self.min_age, self.flagged_ages
        )?;
        write!(f, "{}", self.by_reason)?;
        write!(f, "{}", self.by_result)
    }
}

/// Build the age diagnostic over coerced rows
#[must_use]
pub fn age_diagnostic(rows: &[CoercedRow], min_age: f64) -> AgeDiagnostic {
    let flagged = |r: &CoercedRow| r.driver_age < min_age;
    let text = |r: &'_ CoercedRow, column: &str| -> String {
        r.raw.get(column).unwrap_or("<missing>").to_string()
    };

    let reasons: Vec<(String, bool)> = rows
        .iter()
        .map(|r| (text(r, columns::REASON_FOR_STOP), flagged(r)))
        .collect();
    let results: Vec<(String, bool)> = rows
        .iter()
        .map(|r| (text(r, columns::RESULT_OF_STOP), flagged(r)))
        .collect();

    let flagged_ages = rows
        .iter()
        .filter(|r| flagged(r))
        .map(|r| r.driver_age)
        .sorted_by(f64::total_cmp)
        .dedup()
        .collect();

    AgeDiagnostic {
        min_age,
        flagged_rows: rows.iter().filter(|r| flagged(r)).count(),
        total_rows: rows.len(),
        flagged_ages,
        by_reason: CategoryBreakdown::from_pairs(
            columns::REASON_FOR_STOP,
            reasons.iter().map(|(v, f)| (v.as_str(), *f)),
        ),
        by_result: CategoryBreakdown::from_pairs(
            columns::RESULT_OF_STOP,
            results.iter().map(|(v, f)| (v.as_str(), *f)),
        ),
    }
}

/// Rows with a missing value compared with their partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingnessReport {
    pub partition: String,
    pub missing_rows: usize,
    pub total_rows: usize,
    pub by_racial_match: CategoryBreakdown,
}

impl fmt::Display for MissingnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} of {} rows have a missing value",
            self.partition, self.missing_rows, self.total_rows
        )?;
        write!(f, "{}", self.by_racial_match)
    }
}

/// Compare rows with missing values against the whole partition
#[must_use]
pub fn missingness_report(partition: &str, records: &[StopRecord]) -> MissingnessReport {
    let pairs: Vec<(String, bool)> = records
        .iter()
        .map(|r| (r.racial_match.to_string(), r.has_missing()))
        .collect();

    MissingnessReport {
        partition: partition.to_string(),
        missing_rows: records.iter().filter(|r| r.has_missing()).count(),
        total_rows: records.len(),
        by_racial_match: CategoryBreakdown::from_pairs(
            columns::RACIAL_MATCH,
            pairs.iter().map(|(v, f)| (v.as_str(), *f)),
        ),
    }
}
