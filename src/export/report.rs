//! Metrics summary written next to the model

use crate::optimizer::{Study, TrialParams};
use crate::training::cross_validation::CrossValidationReport;
use crate::training::evaluation::{ModelEvaluation, OverfittingRow};
use crate::training::selection::{ModelComparison, RankedModel};
use crate::training::split::SplitSizes;
use serde::{Deserialize, Serialize};

/// Outcome of the hyperparameter search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationSummary {
    pub base_model: String,
    pub optimized_model: String,
    pub best_params: TrialParams,
    /// Mean cross-validated F1 of the best trial
    pub best_cv_f1: f64,
    pub study: Study,
}

/// Everything a training run measured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub best_model_name: String,
    pub run_id: String,
    pub input_file: Option<String>,
    pub target: String,
    pub seed: u64,
    pub split_sizes: SplitSizes,
    /// Sorted by F1, descending
    pub metrics_validation: Vec<ModelEvaluation>,
    /// Sorted by F1, descending
    pub metrics_test: Vec<ModelEvaluation>,
    pub overfitting_analysis: Vec<OverfittingRow>,
    pub cross_validation: Vec<CrossValidationReport>,
    /// Composite ranking, best first
    pub comparison: Vec<RankedModel>,
    pub optimization: Option<OptimizationSummary>,
    /// Base vs optimized on test
    pub improvement: Option<ModelComparison>,
}

impl TrainingReport {
    /// Test metrics of the persisted model
    pub fn best_test_metrics(&self) -> Option<&ModelEvaluation> {
        self.metrics_test
            .iter()
            .find(|row| row.model == self.best_model_name)
    }
}
