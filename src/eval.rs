//! Classification performance summaries for binary predictions

use std::fmt;
use std::fs;
use std::path::Path;

use ndarray::Array1;

/// Precision/recall/F1/support for a single class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class report plus overall accuracy for binary {0, 1} predictions
#[derive(Debug, Clone)]
pub struct ClassificationReport {
    pub negative: ClassMetrics,
    pub positive: ClassMetrics,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Compute the report from true and predicted labels
    ///
    /// Only the binary case is handled; any label outside {0, 1} is an error.
    pub fn from_predictions(
        y_true: &Array1<usize>,
        y_pred: &Array1<usize>,
    ) -> crate::Result<Self> {
        if y_true.len() != y_pred.len() {
            anyhow::bail!(
                "Got {} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            );
        }
        if y_true.is_empty() {
            anyhow::bail!("Cannot compute a classification report on zero samples");
        }
        if let Some(&label) = y_true.iter().chain(y_pred.iter()).find(|&&l| l > 1) {
            anyhow::bail!("Labels must be binary (0 or 1), found {}", label);
        }

        let mut tp = 0usize;
        let mut tn = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&truth, &prediction) in y_true.iter().zip(y_pred.iter()) {
            match (truth, prediction) {
                (1, 1) => tp += 1,
                (0, 0) => tn += 1,
                (0, 1) => fp += 1,
                _ => fn_ += 1,
            }
        }

        // Class 1 metrics from the confusion counts; class 0 is symmetric
        let positive = class_metrics(tp, fp, fn_, tp + fn_);
        let negative = class_metrics(tn, fn_, fp, tn + fp);

        let total = y_true.len();
        let accuracy = (tp + tn) as f64 / total as f64;

        let macro_avg = ClassMetrics {
            precision: (negative.precision + positive.precision) / 2.0,
            recall: (negative.recall + positive.recall) / 2.0,
            f1: (negative.f1 + positive.f1) / 2.0,
            support: total,
        };

        let w0 = negative.support as f64 / total as f64;
        let w1 = positive.support as f64 / total as f64;
        let weighted_avg = ClassMetrics {
            precision: negative.precision * w0 + positive.precision * w1,
            recall: negative.recall * w0 + positive.recall * w1,
            f1: negative.f1 * w0 + positive.f1 * w1,
            support: total,
        };

        Ok(Self {
            negative,
            positive,
            accuracy,
            macro_avg,
            weighted_avg,
        })
    }
}

fn class_metrics(true_hits: usize, false_hits: usize, misses: usize, support: usize) -> ClassMetrics {
    let precision = ratio(true_hits, true_hits + false_hits);
    let recall = ratio(true_hits, true_hits + misses);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassMetrics {
        precision,
        recall,
        f1,
        support,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (label, metrics) in [("0", &self.negative), ("1", &self.positive)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                label, metrics.precision, metrics.recall, metrics.f1, metrics.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>32.2} {:>10}",
            "accuracy", self.accuracy, self.macro_avg.support
        )?;
        for (label, metrics) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                label, metrics.precision, metrics.recall, metrics.f1, metrics.support
            )?;
        }
        Ok(())
    }
}

/// Fraction of predictions matching the true labels
pub fn accuracy(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Render a model's train and test reports to a text artifact
///
/// The destination path is an explicit parameter of the contract.
pub fn write_model_report<P: AsRef<Path>>(
    path: P,
    model_name: &str,
    train_report: &ClassificationReport,
    test_report: &ClassificationReport,
) -> crate::Result<()> {
    let mut body = String::new();
    body.push_str(&format!("{} Train\n", model_name));
    body.push_str(&train_report.to_string());
    body.push('\n');
    body.push_str(&format!("{} Test\n", model_name));
    body.push_str(&test_report.to_string());

    fs::write(path, body)?;
    Ok(())
}

/// Render the sorted feature-importance ranking to a text artifact
pub fn write_importance_ranking<P: AsRef<Path>>(
    path: P,
    ranking: &[(String, f64)],
    top_n: usize,
) -> crate::Result<()> {
    let mut body = String::from("Feature Importance\n==================\n");
    for (rank, (name, importance)) in ranking.iter().take(top_n).enumerate() {
        body.push_str(&format!("{:>2}. {:<28} {:.4}\n", rank + 1, name, importance));
    }
    fs::write(path, body)?;
    Ok(())
}
