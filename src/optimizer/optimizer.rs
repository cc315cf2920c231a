//! Randomized hyperparameter search over a candidate's model family

use super::config::SearchConfig;
use super::search_space::{require, SearchSpace, TrialParams};
use crate::error::{CreditError, Result};
use crate::preprocessing::ColumnGroups;
use crate::training::cross_validation::cross_validate;
use crate::training::linear_models::Penalty;
use crate::training::models::{ClassWeight, ForestParams, LogisticParams, ModelFamily, ModelSpec};
use crate::training::pipeline::{CandidateSet, CreditPipeline};
use crate::training::random_forest::MaxFeatures;
use ndarray::Array1;
use polars::prelude::DataFrame;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Trial number
    pub trial_id: usize,
    /// Parameters used
    pub params: TrialParams,
    /// Mean cross-validated F1; absent when the trial failed
    pub value: Option<f64>,
    /// Trial duration in seconds
    pub duration_secs: f64,
    /// Failure message of a failed trial
    pub error: Option<String>,
}

/// Study containing all trials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Study {
    /// All trial results, in sampling order
    pub trials: Vec<TrialResult>,
    /// Best trial index
    pub best_trial_idx: Option<usize>,
    /// Total duration
    pub total_duration_secs: f64,
}

impl Study {
    /// Create a new study
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the best trial
    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.map(|idx| &self.trials[idx])
    }

    /// Get the best value
    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().and_then(|t| t.value)
    }

    /// Get the best parameters
    pub fn best_params(&self) -> Option<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    /// Add a trial result; a later trial only wins with a strictly higher value
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();
        if let Some(value) = result.value {
            let is_better = match self.best_value() {
                None => true,
                Some(best) => value > best,
            };
            if is_better {
                self.best_trial_idx = Some(idx);
            }
        }
        self.trials.push(result);
    }

    pub fn n_failed(&self) -> usize {
        self.trials.iter().filter(|t| t.value.is_none()).count()
    }
}

/// Parameter distributions searched for a model family
pub fn search_space_for(family: ModelFamily) -> SearchSpace {
    match family {
        ModelFamily::LogisticRegression => SearchSpace::new()
            .categorical("penalty", vec!["l1", "l2", "elasticnet"])
            .log_float("C", 1e-3, 1e2)
            .categorical("l1_ratio", vec!["0.15", "0.3", "0.5", "0.7", "0.85"]),
        ModelFamily::RandomForest => SearchSpace::new()
            .int("n_estimators", 150, 599)
            .categorical("max_depth", vec!["none", "6", "10", "14", "18", "22"])
            .int("min_samples_split", 2, 19)
            .int("min_samples_leaf", 1, 9)
            .categorical("max_features", vec!["sqrt", "log2", "0.5", "0.7", "1.0"]),
    }
}

fn invalid(name: &str, value: impl ToString) -> CreditError {
    CreditError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: "unexpected sampled value".to_string(),
    }
}

/// Turn a sampled configuration into a model description
pub fn spec_from_params(family: ModelFamily, params: &TrialParams, max_iter: usize) -> Result<ModelSpec> {
    match family {
        ModelFamily::LogisticRegression => {
            let penalty_raw = require(params, "penalty")?;
            let penalty: Penalty = penalty_raw
                .as_string()
                .ok_or_else(|| invalid("penalty", penalty_raw))?
                .parse()?;
            let c = require(params, "C")?
                .as_float()
                .ok_or_else(|| invalid("C", "non-numeric"))?;
            let l1_ratio = require(params, "l1_ratio")?
                .as_float()
                .ok_or_else(|| invalid("l1_ratio", "non-numeric"))?;
            Ok(ModelSpec::LogisticRegression(LogisticParams {
                penalty,
                c,
                l1_ratio,
                max_iter,
                class_weight: ClassWeight::Balanced,
                ..LogisticParams::default()
            }))
        }
        ModelFamily::RandomForest => {
            let int = |name: &str| -> Result<usize> {
                let v = require(params, name)?;
                v.as_int()
                    .filter(|i| *i >= 0)
                    .map(|i| i as usize)
                    .ok_or_else(|| invalid(name, v))
            };
            let depth_raw = require(params, "max_depth")?;
            let max_depth = match depth_raw.as_string() {
                Some("none") => None,
                _ => Some(int("max_depth")?),
            };
            let features_raw = require(params, "max_features")?;
            let max_features: MaxFeatures = features_raw
                .as_string()
                .ok_or_else(|| invalid("max_features", features_raw))?
                .parse()?;
            Ok(ModelSpec::RandomForest(ForestParams {
                n_estimators: int("n_estimators")?,
                max_depth,
                min_samples_split: int("min_samples_split")?,
                min_samples_leaf: int("min_samples_leaf")?,
                max_features,
                bootstrap: true,
                class_weight: ClassWeight::Balanced,
            }))
        }
    }
}

/// Best configuration found for one candidate
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Candidate that was optimized
    pub base_label: String,
    /// Label the refit pipeline is registered under
    pub label: String,
    pub pipeline: CreditPipeline,
    pub best_params: TrialParams,
    pub best_spec: ModelSpec,
    /// Mean cross-validated F1 of the best trial
    pub best_score: f64,
    pub study: Study,
}

/// Randomized search scored by stratified k-fold F1
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    config: SearchConfig,
}

impl RandomizedSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Sample `n_iter` configurations up front and score them in parallel.
    /// The study keeps trials in sampling order.
    pub fn run<F>(&self, space: &SearchSpace, objective: F) -> Result<Study>
    where
        F: Fn(&TrialParams) -> Result<f64> + Sync,
    {
        let start = Instant::now();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let sampled: Vec<TrialParams> = (0..self.config.n_iter).map(|_| space.sample(&mut rng)).collect();

        let results: Vec<TrialResult> = sampled
            .into_par_iter()
            .enumerate()
            .map(|(trial_id, params)| {
                let trial_start = Instant::now();
                let outcome = objective(&params);
                let (value, error) = match outcome {
                    Ok(v) if v.is_finite() => (Some(v), None),
                    Ok(v) => (None, Some(format!("non-finite score {}", v))),
                    Err(e) => (None, Some(e.to_string())),
                };
                TrialResult {
                    trial_id,
                    params,
                    value,
                    duration_secs: trial_start.elapsed().as_secs_f64(),
                    error,
                }
            })
            .collect();

        let mut study = Study::new();
        for result in results {
            if let Some(err) = &result.error {
                warn!(trial = result.trial_id, error = %err, "Trial failed");
            }
            study.add_trial(result);
        }
        study.total_duration_secs = start.elapsed().as_secs_f64();
        Ok(study)
    }

    /// Optimize the candidate registered as `label`.
    ///
    /// Returns `Ok(None)` when no such candidate exists. The best
    /// configuration is refit on the full `x` / `y`.
    pub fn optimize(
        &self,
        candidates: &CandidateSet,
        label: &str,
        groups: &ColumnGroups,
        x: &DataFrame,
        y: &Array1<f64>,
    ) -> Result<Option<SearchOutcome>> {
        let family = match candidates.get(label) {
            Some(pipeline) => pipeline.family(),
            None => {
                warn!(label, "No candidate to optimize");
                return Ok(None);
            }
        };

        let seed = self.config.random_state;
        let max_iter = self.config.max_iter;
        let folds = self.config.cv_folds;
        let space = search_space_for(family);
        info!(
            label,
            %family,
            n_iter = self.config.n_iter,
            folds,
            "Randomized search started"
        );

        let study = self.run(&space, |params| {
            let spec = spec_from_params(family, params, max_iter)?;
            let report = cross_validate(label, groups, &spec, x, y, folds, seed)?;
            if report.f1.is_failed() {
                return Err(CreditError::OptimizationError(
                    "F1 could not be computed on every fold".to_string(),
                ));
            }
            Ok(report.f1.mean_score)
        })?;

        let best = study.best_trial().ok_or_else(|| {
            CreditError::OptimizationError(format!(
                "all {} trials failed for '{}'",
                study.trials.len(),
                label
            ))
        })?;
        let best_params = best.params.clone();
        let best_score = best.value.unwrap_or_default();
        let best_spec = spec_from_params(family, &best_params, max_iter)?;

        let pipeline = CreditPipeline::fit(groups, &best_spec, x, y, seed)?;
        let new_label = format!("{} (optimized)", label);

        info!(
            label = %new_label,
            best_trial = best.trial_id,
            cv_f1 = best_score,
            failed = study.n_failed(),
            elapsed_secs = study.total_duration_secs,
            "Randomized search finished"
        );
        for (name, value) in &best_params {
            info!(param = %name, value = %value, "Best parameter");
        }

        Ok(Some(SearchOutcome {
            base_label: label.to_string(),
            label: new_label,
            pipeline,
            best_params,
            best_spec,
            best_score,
            study,
        }))
    }
}
