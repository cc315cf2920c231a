//! Binary classification metrics

use crate::error::{CreditError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Confusion matrix counts with class 1 as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tn: usize,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut counts = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.fn_ + self.tn
    }
}

/// Ratio with zero_division = 0
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Metrics for one model on one partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub f1: f64,
    /// 0.0 when only one class is present
    pub roc_auc: f64,
    pub confusion: ConfusionCounts,
}

impl ClassificationMetrics {
    /// Compute every metric from true labels, hard predictions and P(1).
    ///
    /// An undefined ROC-AUC is reported as 0.0; use [`Self::compute_with_auc`]
    /// to observe the failure.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>, y_prob: &Array1<f64>) -> Result<Self> {
        Self::compute_with_auc(y_true, y_pred, y_prob).map(|(metrics, _)| metrics)
    }

    /// Like [`Self::compute`], also returning the ROC-AUC as `None` when it is
    /// undefined for these labels
    pub fn compute_with_auc(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_prob: &Array1<f64>,
    ) -> Result<(Self, Option<f64>)> {
        if y_true.len() != y_pred.len() || y_true.len() != y_prob.len() {
            return Err(CreditError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} labels, {} probabilities", y_pred.len(), y_prob.len()),
            });
        }
        if y_true.is_empty() {
            return Err(CreditError::EvaluationError(
                "cannot compute metrics on zero rows".to_string(),
            ));
        }

        let c = ConfusionCounts::from_labels(y_true, y_pred);
        let precision = ratio(c.tp, c.tp + c.fp);
        let recall = ratio(c.tp, c.tp + c.fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        let auc = roc_auc(y_true, y_prob).ok();

        let metrics = Self {
            accuracy: ratio(c.tp + c.tn, c.total()),
            precision,
            recall,
            specificity: ratio(c.tn, c.tn + c.fp),
            f1,
            roc_auc: auc.unwrap_or(0.0),
            confusion: c,
        };
        Ok((metrics, auc))
    }
}

/// Area under the ROC curve via the rank-sum statistic, ties get average ranks
pub fn roc_auc(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<f64> {
    let n_pos = y_true.iter().filter(|&&v| v > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(CreditError::EvaluationError(
            "ROC-AUC is undefined when only one class is present".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    let mut ranks = vec![0.0; order.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        // 1-based average rank of the tie group
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(t, _)| **t > 0.5)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_metrics_from_confusion() {
        let y_true = array![1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let y_pred = array![1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let y_prob = array![0.9, 0.8, 0.4, 0.7, 0.3, 0.2, 0.1, 0.05];
        let m = ClassificationMetrics::compute(&y_true, &y_pred, &y_prob).unwrap();

        assert_eq!(m.confusion, ConfusionCounts { tp: 2, fp: 1, fn_: 1, tn: 4 });
        assert!((m.accuracy - 0.75).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.specificity - 0.8).abs() < 1e-12);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-12);
        // 14 of 15 positive/negative pairs ordered correctly
        assert!((m.roc_auc - 14.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_yields_zero() {
        let y_true = array![0.0, 0.0, 1.0];
        let y_pred = array![0.0, 0.0, 0.0];
        let m = ClassificationMetrics::compute(&y_true, &y_pred, &array![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
        assert_eq!(m.roc_auc, 1.0);
    }

    #[test]
    fn test_auc_single_class() {
        let y_true = array![1.0, 1.0];
        assert!(roc_auc(&y_true, &array![0.2, 0.9]).is_err());
        let m = ClassificationMetrics::compute(&y_true, &array![1.0, 1.0], &array![0.6, 0.9]).unwrap();
        assert_eq!(m.roc_auc, 0.0);
        assert_eq!(m.specificity, 0.0);

        let (_, auc) =
            ClassificationMetrics::compute_with_auc(&y_true, &array![1.0, 1.0], &array![0.6, 0.9]).unwrap();
        assert_eq!(auc, None);
    }

    #[test]
    fn test_auc_ties() {
        let y_true = array![0.0, 1.0, 0.0, 1.0];
        let auc = roc_auc(&y_true, &array![0.5, 0.5, 0.5, 0.5]).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);
    }
}
