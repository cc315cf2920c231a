//! Candidate evaluation on the held-out partitions

use super::metrics::ClassificationMetrics;
use super::pipeline::CandidateSet;
use crate::error::{CreditError, Result};
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Dataset partition a metric refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Validation,
    Test,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Train => f.write_str("train"),
            Partition::Validation => f.write_str("validation"),
            Partition::Test => f.write_str("test"),
        }
    }
}

/// Metrics of one candidate on one partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub model: String,
    #[serde(flatten)]
    pub metrics: ClassificationMetrics,
}

/// Evaluate every candidate on `x` / `y`. The result is sorted by F1,
/// descending, with candidate order breaking ties.
pub fn evaluate_candidates(
    candidates: &CandidateSet,
    x: &DataFrame,
    y: &Array1<f64>,
    partition: Partition,
) -> Result<Vec<ModelEvaluation>> {
    if candidates.is_empty() {
        return Err(CreditError::EvaluationError(
            "no candidates to evaluate".to_string(),
        ));
    }
    let positives = y.iter().filter(|&&v| v > 0.5).count();
    if positives == 0 || positives == y.len() {
        warn!(%partition, rows = y.len(), "Single class present, ROC-AUC reported as 0.0");
    }

    let mut rows = Vec::with_capacity(candidates.len());
    for (label, pipeline) in candidates.iter() {
        let proba = pipeline.predict_proba(x)?;
        let pred = proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 });
        let metrics = ClassificationMetrics::compute(y, &pred, &proba)?;
        info!(
            model = label,
            %partition,
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            roc_auc = metrics.roc_auc,
            "Candidate evaluated"
        );
        rows.push(ModelEvaluation {
            model: label.to_string(),
            metrics,
        });
    }

    rows.sort_by(|a, b| b.metrics.f1.total_cmp(&a.metrics.f1));
    Ok(rows)
}

/// Latest evaluation table per partition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsCache {
    tables: BTreeMap<Partition, Vec<ModelEvaluation>>,
}

impl MetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a table, replacing the previous one for that partition
    pub fn insert(&mut self, partition: Partition, table: Vec<ModelEvaluation>) {
        self.tables.insert(partition, table);
    }

    pub fn table(&self, partition: Partition) -> Option<&[ModelEvaluation]> {
        self.tables.get(&partition).map(|t| t.as_slice())
    }

    pub fn get(&self, partition: Partition, model: &str) -> Option<&ClassificationMetrics> {
        self.tables
            .get(&partition)?
            .iter()
            .find(|row| row.model == model)
            .map(|row| &row.metrics)
    }

    /// Metrics for `model` on `partition`, or `MissingMetrics`
    pub fn require(&self, partition: Partition, model: &str) -> Result<&ClassificationMetrics> {
        self.get(partition, model).ok_or_else(|| {
            CreditError::MissingMetrics(format!("no {} metrics for '{}'", partition, model))
        })
    }
}

/// Train / validation / test gap for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverfittingRow {
    pub model: String,
    pub f1_train: f64,
    pub f1_val: f64,
    pub f1_test: f64,
    pub accuracy_train: f64,
    pub accuracy_val: f64,
    pub accuracy_test: f64,
    /// F1 train minus F1 validation
    pub diff_train_val: f64,
    /// F1 validation minus F1 test
    pub diff_val_test: f64,
}

/// Compare train, validation and test metrics of each candidate
pub fn overfitting_analysis(cache: &MetricsCache, models: &[&str]) -> Result<Vec<OverfittingRow>> {
    models
        .iter()
        .map(|&model| {
            let train = cache.require(Partition::Train, model)?;
            let val = cache.require(Partition::Validation, model)?;
            let test = cache.require(Partition::Test, model)?;
            let row = OverfittingRow {
                model: model.to_string(),
                f1_train: train.f1,
                f1_val: val.f1,
                f1_test: test.f1,
                accuracy_train: train.accuracy,
                accuracy_val: val.accuracy,
                accuracy_test: test.accuracy,
                diff_train_val: train.f1 - val.f1,
                diff_val_test: val.f1 - test.f1,
            };
            info!(
                model,
                diff_train_val = row.diff_train_val,
                diff_val_test = row.diff_val_test,
                "Overfitting check"
            );
            Ok(row)
        })
        .collect()
}
