use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Precision, recall and f1 for a single label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Unweighted or support-weighted mean over labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Held-out evaluation of a classifier; zero division yields 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

impl ClassificationReport {
    /// Compare true and predicted class indices; `labels[i]` names class `i`
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize], labels: &[String]) -> Self {
        let n_samples = y_true.len();
        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| t == p)
            .count();

        let per_class: Vec<ClassMetrics> = labels
            .iter()
            .enumerate()
            .map(|(class_idx, label)| {
                let tp = y_true
                    .iter()
                    .zip(y_pred.iter())
                    .filter(|(t, p)| **t == class_idx && **p == class_idx)
                    .count();
                let predicted = y_pred.iter().filter(|&&p| p == class_idx).count();
                let support = y_true.iter().filter(|&&t| t == class_idx).count();

                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect();

        let n_labels = per_class.len().max(1) as f64;
        let macro_avg = AveragedMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / n_labels,
            recall: per_class.iter().map(|m| m.recall).sum::<f64>() / n_labels,
            f1_score: per_class.iter().map(|m| m.f1_score).sum::<f64>() / n_labels,
        };

        let total_support = per_class.iter().map(|m| m.support).sum::<usize>();
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total_support == 0 {
                0.0
            } else {
                per_class
                    .iter()
                    .map(|m| f(m) * m.support as f64)
                    .sum::<f64>()
                    / total_support as f64
            }
        };
        let weighted_avg = AveragedMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1_score: weighted(|m| m.f1_score),
        };

        Self {
            accuracy: ratio(correct, n_samples),
            per_class,
            macro_avg,
            weighted_avg,
            support: n_samples,
        }
    }

    /// Compare true and predicted label names. Rows cover every label seen in
    /// either sequence, sorted, so labels missing from training still count
    /// towards the averages.
    pub fn from_label_names<T: AsRef<str>, P: AsRef<str>>(y_true: &[T], y_pred: &[P]) -> Self {
        let labels: Vec<String> = y_true
            .iter()
            .map(|l| l.as_ref())
            .chain(y_pred.iter().map(|l| l.as_ref()))
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let index = |name: &str| labels.iter().position(|l| l == name).unwrap_or(labels.len());

        let true_idx: Vec<usize> = y_true.iter().map(|l| index(l.as_ref())).collect();
        let pred_idx: Vec<usize> = y_pred.iter().map(|l| index(l.as_ref())).collect();
        Self::from_predictions(&true_idx, &pred_idx, &labels)
    }

    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.per_class.iter().find(|m| m.label == label)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .per_class
            .iter()
            .map(|m| m.label.chars().count())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = width
        )?;
        writeln!(f)?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label,
                m.precision,
                m.recall,
                m.f1_score,
                m.support,
                width = width
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support,
            width = width
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name,
                avg.precision,
                avg.recall,
                avg.f1_score,
                self.support,
                width = width
            )?;
        }
        Ok(())
    }
}
