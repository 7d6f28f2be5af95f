//! Binary classification metrics over 0/1 labels.
//!
//! Undefined ratios (no predicted positives, no actual positives) are 0.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Counts of a binary confusion matrix, rows = truth, columns = prediction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    /// Tally truth/prediction pairs; label values other than 1 count as 0
    #[must_use]
    pub fn from_labels(truth: &Array1<usize>, predicted: &Array1<usize>) -> Self {
        let mut m = Self::default();
        for (&t, &p) in truth.iter().zip(predicted.iter()) {
            match (t == 1, p == 1) {
                (false, false) => m.tn += 1,
                (false, true) => m.fp += 1,
                (true, false) => m.fn_ += 1,
                (true, true) => m.tp += 1,
            }
        }
        m
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    /// `[[tn, fp], [fn, tp]]`
    #[must_use]
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.tn + self.tp, self.total())
    }

    /// Precision, recall and support of one class
    #[must_use]
    pub fn class_scores(&self, label: usize) -> ClassScores {
        let (hit, predicted, actual) = if label == 1 {
            (self.tp, self.tp + self.fp, self.tp + self.fn_)
        } else {
            (self.tn, self.tn + self.fn_, self.tn + self.fp)
        };
        let precision = ratio(hit, predicted);
        let recall = ratio(hit, actual);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassScores {
            precision,
            recall,
            f1,
            support: actual,
        }
    }

    /// Matthews correlation coefficient
    #[must_use]
    pub fn mcc(&self) -> f64 {
        let (tp, tn, fp, fn_) = (
            self.tp as f64,
            self.tn as f64,
            self.fp as f64,
            self.fn_ as f64,
        );
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        if denominator == 0.0 {
            0.0
        } else {
            (tp * tn - fp * fn_) / denominator
        }
    }

    /// Text rendering with labelled rows and columns
    #[must_use]
    pub fn render(&self) -> String {
        let width = self
            .as_rows()
            .iter()
            .flatten()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1)
            .max(6);
        let mut out = format!("{:>8} | {:>width$} {:>width$}\n", "", "pred 0", "pred 1");
        out.push_str(&format!("{}\n", "-".repeat(11 + 2 * width)));
        for (label, row) in self.as_rows().iter().enumerate() {
            out.push_str(&format!(
                "{:>8} | {:>width$} {:>width$}\n",
                format!("true {label}"),
                row[0],
                row[1]
            ));
        }
        out
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[must_use]
pub fn accuracy(truth: &Array1<usize>, predicted: &Array1<usize>) -> f64 {
    ConfusionMatrix::from_labels(truth, predicted).accuracy()
}

/// Recall of class 1
#[must_use]
pub fn recall(truth: &Array1<usize>, predicted: &Array1<usize>) -> f64 {
    ConfusionMatrix::from_labels(truth, predicted)
        .class_scores(1)
        .recall
}

#[must_use]
pub fn matthews_corrcoef(truth: &Array1<usize>, predicted: &Array1<usize>) -> f64 {
    ConfusionMatrix::from_labels(truth, predicted).mcc()
}

/// Precision, recall, F1 and support of one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class scores with accuracy, macro and support-weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: [ClassScores; 2],
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    #[must_use]
    pub fn new(truth: &Array1<usize>, predicted: &Array1<usize>) -> Self {
        Self::from_confusion(&ConfusionMatrix::from_labels(truth, predicted))
    }

    #[must_use]
    pub fn from_confusion(matrix: &ConfusionMatrix) -> Self {
        let classes = [matrix.class_scores(0), matrix.class_scores(1)];
        let total = matrix.total();
        let average = |weight: &dyn Fn(&ClassScores) -> f64| {
            let pick = |f: fn(&ClassScores) -> f64| classes.iter().map(|c| f(c) * weight(c)).sum::<f64>();
            ClassScores {
                precision: pick(|c| c.precision),
                recall: pick(|c| c.recall),
                f1: pick(|c| c.f1),
                support: total,
            }
        };
        let macro_avg = average(&|_| 0.5);
        let weighted_avg = average(&|c| ratio(c.support, total));
        Self {
            classes,
            accuracy: matrix.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, label: &str, s: &ClassScores| {
            writeln!(
                f,
                "{label:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                s.precision, s.recall, s.f1, s.support
            )
        };
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (label, scores) in self.classes.iter().enumerate() {
            row(f, &label.to_string(), scores)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}
