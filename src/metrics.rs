// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-class classification report.
//!
//! Precision, recall, F1 and support per class, keyed by class name in catalog
//! order, plus accuracy and macro/weighted averages. A zero denominator yields
//! 0.0 for that metric.

#![allow(clippy::cast_precision_loss)]

use std::fmt;

use crate::catalog::ClassCatalog;
use crate::error::{Result, SignError};

/// Metrics for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    /// Class name.
    pub name: String,
    /// TP / (TP + FP).
    pub precision: f32,
    /// TP / (TP + FN).
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1: f32,
    /// Number of true samples of this class.
    pub support: usize,
}

/// Averaged precision/recall/F1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AverageMetrics {
    /// Averaged precision.
    pub precision: f32,
    /// Averaged recall.
    pub recall: f32,
    /// Averaged F1.
    pub f1: f32,
}

/// Evaluation of predictions against ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    /// One entry per catalog class, in catalog order.
    pub classes: Vec<ClassMetrics>,
    /// Fraction of correct predictions.
    pub accuracy: f32,
    /// Unweighted mean over classes.
    pub macro_avg: AverageMetrics,
    /// Mean over classes weighted by support.
    pub weighted_avg: AverageMetrics,
    /// Total number of samples.
    pub total: usize,
    /// `confusion[truth][predicted]` counts.
    pub confusion: Vec<Vec<usize>>,
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 { 0.0 } else { num as f32 / den as f32 }
}

impl ClassificationReport {
    /// Build a report from aligned ground-truth and predicted labels.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the slices differ in length or any
    /// label is outside the catalog.
    pub fn compute(truth: &[usize], predicted: &[usize], catalog: &ClassCatalog) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(SignError::ConfigError(format!(
                "{} labels but {} predictions",
                truth.len(),
                predicted.len()
            )));
        }
        let n = catalog.len();
        let mut confusion = vec![vec![0_usize; n]; n];
        for (&t, &p) in truth.iter().zip(predicted) {
            if t >= n || p >= n {
                return Err(SignError::ConfigError(format!(
                    "label {} is outside the {n}-class catalog",
                    t.max(p)
                )));
            }
            confusion[t][p] += 1;
        }

        let classes: Vec<ClassMetrics> = catalog
            .names()
            .iter()
            .enumerate()
            .map(|(k, name)| {
                let tp = confusion[k][k];
                let support: usize = confusion[k].iter().sum();
                let predicted_k: usize = confusion.iter().map(|row| row[k]).sum();
                let precision = ratio(tp, predicted_k);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    name: name.clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let total = truth.len();
        let correct: usize = (0..n).map(|k| confusion[k][k]).sum();

        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f32>() / n as f32,
            recall: classes.iter().map(|c| c.recall).sum::<f32>() / n as f32,
            f1: classes.iter().map(|c| c.f1).sum::<f32>() / n as f32,
        };
        let weighted = |metric: fn(&ClassMetrics) -> f32| {
            if total == 0 {
                0.0
            } else {
                classes
                    .iter()
                    .map(|c| metric(c) * c.support as f32)
                    .sum::<f32>()
                    / total as f32
            }
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        };

        Ok(Self {
            accuracy: ratio(correct, total),
            classes,
            macro_avg,
            weighted_avg,
            total,
            confusion,
        })
    }

    /// Metrics for a class by name.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.chars().count())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.name, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        for (name, avg) in [("macro avg", self.macro_avg), ("weighted avg", self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, self.total
            )?;
        }
        Ok(())
    }
}
