//! Stratified k-fold cross-validation of whole pipelines

use super::metrics::ClassificationMetrics;
use super::models::ModelSpec;
use super::pipeline::CreditPipeline;
use super::split::{take_labels, take_rows};
use crate::error::{CreditError, Result};
use crate::preprocessing::ColumnGroups;
use ndarray::Array1;
use polars::prelude::DataFrame;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            random_state: None,
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate stratified train/test splits.
    ///
    /// Classes are walked in sorted order and their (shuffled) rows dealt to
    /// the folds round-robin, so every fold gets its share of each class.
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_samples = y.len();
        if self.n_splits < 2 {
            return Err(CreditError::ConfigError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < self.n_splits {
            return Err(CreditError::ConfigError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        // Group samples by class
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for (position, idx) in class_indices.values().flatten().enumerate() {
            folds[position % self.n_splits].push(*idx);
        }

        let splits = (0..self.n_splits)
            .map(|fold_idx| {
                let mut test_indices = folds[fold_idx].clone();
                test_indices.sort_unstable();
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

/// Cross-validation results for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold; empty when the metric failed
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Population standard deviation of scores
    pub std_score: f64,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        if scores.is_empty() {
            return Self::failed();
        }
        let n_folds = scores.len() as f64;
        let mean_score = scores.iter().sum::<f64>() / n_folds;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
        }
    }

    /// Placeholder for a metric that could not be computed on some fold
    pub fn failed() -> Self {
        Self {
            scores: Vec::new(),
            mean_score: 0.0,
            std_score: 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Per-metric cross-validation summary of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub model: String,
    pub n_folds: usize,
    pub accuracy: CVResults,
    pub precision: CVResults,
    pub recall: CVResults,
    pub f1: CVResults,
    pub roc_auc: CVResults,
}

impl CrossValidationReport {
    fn all_failed(model: &str, n_folds: usize) -> Self {
        Self {
            model: model.to_string(),
            n_folds,
            accuracy: CVResults::failed(),
            precision: CVResults::failed(),
            recall: CVResults::failed(),
            f1: CVResults::failed(),
            roc_auc: CVResults::failed(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FoldScores {
    accuracy: f64,
    precision: f64,
    recall: f64,
    f1: f64,
    roc_auc: Option<f64>,
}

fn score_fold(
    groups: &ColumnGroups,
    spec: &ModelSpec,
    x: &DataFrame,
    y: &Array1<f64>,
    split: &CVSplit,
    seed: u64,
) -> Result<FoldScores> {
    let x_train = take_rows(x, &split.train_indices)?;
    let y_train = take_labels(y, &split.train_indices);
    let x_test = take_rows(x, &split.test_indices)?;
    let y_test = take_labels(y, &split.test_indices);

    let pipeline = CreditPipeline::fit(groups, spec, &x_train, &y_train, seed)?;
    let proba = pipeline.predict_proba(&x_test)?;
    let pred = proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 });

    let (m, roc_auc) = ClassificationMetrics::compute_with_auc(&y_test, &pred, &proba)?;

    Ok(FoldScores {
        accuracy: m.accuracy,
        precision: m.precision,
        recall: m.recall,
        f1: m.f1,
        roc_auc,
    })
}

/// Refit the whole pipeline on each fold and collect accuracy, precision,
/// recall, F1 and ROC-AUC.
///
/// A metric that cannot be computed on some fold is reported as failed
/// while the others are kept. A fold whose fit fails fails every metric.
pub fn cross_validate(
    model: &str,
    groups: &ColumnGroups,
    spec: &ModelSpec,
    x: &DataFrame,
    y: &Array1<f64>,
    n_splits: usize,
    seed: u64,
) -> Result<CrossValidationReport> {
    let splits = CrossValidator::new(n_splits)
        .with_random_state(seed)
        .split(y)?;

    let folds: Vec<Result<FoldScores>> = splits
        .par_iter()
        .map(|split| score_fold(groups, spec, x, y, split, seed))
        .collect();

    let mut scores = Vec::with_capacity(folds.len());
    for (fold_idx, fold) in folds.into_iter().enumerate() {
        match fold {
            Ok(s) => scores.push(s),
            Err(e) => {
                warn!(model, fold = fold_idx, error = %e, "Cross-validation fold failed");
                return Ok(CrossValidationReport::all_failed(model, n_splits));
            }
        }
    }

    let collect = |f: fn(&FoldScores) -> f64| CVResults::from_scores(scores.iter().map(f).collect());
    let roc_auc = match scores.iter().map(|s| s.roc_auc).collect::<Option<Vec<f64>>>() {
        Some(values) => CVResults::from_scores(values),
        None => {
            warn!(model, "ROC-AUC undefined on at least one fold");
            CVResults::failed()
        }
    };

    let report = CrossValidationReport {
        model: model.to_string(),
        n_folds: n_splits,
        accuracy: collect(|s| s.accuracy),
        precision: collect(|s| s.precision),
        recall: collect(|s| s.recall),
        f1: collect(|s| s.f1),
        roc_auc,
    };

    info!(
        model,
        folds = n_splits,
        f1_mean = report.f1.mean_score,
        f1_std = report.f1.std_score,
        roc_auc_mean = report.roc_auc.mean_score,
        "Cross-validation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::models::LogisticParams;
    use polars::prelude::*;

    /// 40 rows, one numeric feature, positives only at the three largest values
    fn rare_positive_frame() -> (ColumnGroups, DataFrame, Array1<f64>) {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y: Array1<f64> = (0..40).map(|i| if i >= 37 { 1.0 } else { 0.0 }).collect();
        let groups = ColumnGroups {
            numeric: vec!["x".to_string()],
            ..ColumnGroups::default()
        };
        (groups, df!("x" => x).unwrap(), y)
    }

    #[test]
    fn test_stratified_k_fold() {
        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, // 5 samples of class 0
            1.0, 1.0, 1.0, 1.0, 1.0, // 5 samples of class 1
        ]);

        let cv = CrossValidator::new(5).with_shuffle(false);
        let splits = cv.split(&y).unwrap();

        assert_eq!(splits.len(), 5);

        // Each fold should have 1 sample from each class
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let positives = split.test_indices.iter().filter(|&&i| y[i] > 0.5).count();
            assert_eq!(positives, 1);
        }
    }

    #[test]
    fn test_folds_cover_every_row_once() {
        let y: Array1<f64> = (0..53).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }).collect();
        let splits = CrossValidator::new(5).with_random_state(42).split(&y).unwrap();

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..53).collect::<Vec<_>>());

        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 53);
            assert!(split.test_indices.len() == 10 || split.test_indices.len() == 11);
        }
    }

    #[test]
    fn test_invalid_fold_counts() {
        let y = Array1::from_vec(vec![0.0, 1.0, 0.0]);
        assert!(matches!(CrossValidator::new(1).split(&y), Err(CreditError::ConfigError(_))));
        assert!(matches!(CrossValidator::new(4).split(&y), Err(CreditError::ConfigError(_))));
    }

    #[test]
    fn test_cv_results() {
        let r = CVResults::from_scores(vec![0.6, 0.8]);
        assert!((r.mean_score - 0.7).abs() < 1e-12);
        assert!((r.std_score - 0.1).abs() < 1e-12);
        assert!(!r.is_failed());
        assert!(CVResults::failed().is_failed());
        assert_eq!(CVResults::failed().mean_score, 0.0);
    }

    #[test]
    fn test_undefined_auc_fails_only_that_metric() {
        let (groups, x, y) = rare_positive_frame();
        let spec = ModelSpec::LogisticRegression(LogisticParams::default());

        // three positives over five folds leave two test folds single-class
        let report = cross_validate("lr", &groups, &spec, &x, &y, 5, 42).unwrap();

        assert_eq!(report.n_folds, 5);
        assert!(report.roc_auc.is_failed());
        assert_eq!(report.roc_auc.mean_score, 0.0);
        assert_eq!(report.roc_auc.std_score, 0.0);
        for metric in [&report.accuracy, &report.precision, &report.recall, &report.f1] {
            assert!(!metric.is_failed());
            assert_eq!(metric.scores.len(), 5);
        }
        assert!(report.accuracy.mean_score > 0.5);
    }

    #[test]
    fn test_failed_fit_fails_every_metric() {
        let (groups, x, y) = rare_positive_frame();
        let spec = ModelSpec::LogisticRegression(LogisticParams {
            c: -1.0,
            ..LogisticParams::default()
        });

        let report = cross_validate("lr", &groups, &spec, &x, &y, 5, 42).unwrap();
        assert_eq!(report, CrossValidationReport::all_failed("lr", 5));
    }

    #[test]
    fn test_fold_scores_match_classification_metrics() {
        let (groups, x, y) = rare_positive_frame();
        let spec = ModelSpec::LogisticRegression(LogisticParams::default());
        let splits = CrossValidator::new(5).with_random_state(42).split(&y).unwrap();

        for split in &splits {
            let fold = score_fold(&groups, &spec, &x, &y, split, 42).unwrap();
            let x_train = take_rows(&x, &split.train_indices).unwrap();
            let y_train = take_labels(&y, &split.train_indices);
            let x_test = take_rows(&x, &split.test_indices).unwrap();
            let y_test = take_labels(&y, &split.test_indices);
            let pipeline = CreditPipeline::fit(&groups, &spec, &x_train, &y_train, 42).unwrap();
            let pred = pipeline.predict(&x_test).unwrap();
            let proba = pipeline.predict_proba(&x_test).unwrap();
            let m = ClassificationMetrics::compute(&y_test, &pred, &proba).unwrap();

            assert_eq!(fold.accuracy, m.accuracy);
            assert_eq!(fold.precision, m.precision);
            assert_eq!(fold.recall, m.recall);
            assert_eq!(fold.f1, m.f1);
        }
    }
}
