//! Training engine: split, train, evaluate, cross-validate, optimize, select, persist

use super::config::TrainingConfig;
use super::cross_validation::{cross_validate, CrossValidationReport};
use super::evaluation::{evaluate_candidates, overfitting_analysis, MetricsCache, OverfittingRow, Partition};
use super::models::{ForestParams, LogisticParams, ModelSpec};
use super::pipeline::{CandidateSet, CreditPipeline};
use super::selection::{best_by_validation_f1, compare_base_optimized, rank_models, ModelComparison, RankedModel};
use super::split::DataSplit;
use crate::error::{CreditError, Result};
use crate::export::{ArtifactPaths, ArtifactWriter, ModelArtifact, ModelManifest, OptimizationSummary, TrainingReport};
use crate::optimizer::{RandomizedSearch, SearchConfig, SearchOutcome};
use crate::preprocessing::{detect_column_types, ColumnGroups};
use crate::utils::{resolve_target, split_features_target, DataLoader};
use chrono::Local;
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Result of a complete training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub best_model: String,
    pub run_id: String,
    pub manifest: ModelManifest,
    pub paths: ArtifactPaths,
    pub report: TrainingReport,
}

/// Timestamp run id with a short random suffix, so runs started within the
/// same second never share artifact file names
fn new_run_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), &suffix[..8])
}

/// Main training engine.
///
/// Owns every piece of state a run produces. The candidate set only grows:
/// base models first, then the optimized candidate.
#[derive(Debug)]
pub struct TrainEngine {
    config: TrainingConfig,
    input_file: Option<String>,
    target: Option<String>,
    split: Option<DataSplit>,
    groups: Option<ColumnGroups>,
    candidates: CandidateSet,
    metrics: MetricsCache,
    cv_results: Vec<CrossValidationReport>,
    search: Option<SearchOutcome>,
    comparison: Option<ModelComparison>,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            input_file: None,
            target: None,
            split: None,
            groups: None,
            candidates: CandidateSet::new(),
            metrics: MetricsCache::new(),
            cv_results: Vec::new(),
            search: None,
            comparison: None,
        }
    }

    /// Record where the data came from, for the metrics report
    pub fn with_input_file(mut self, path: impl AsRef<Path>) -> Self {
        self.input_file = Some(path.as_ref().display().to_string());
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    pub fn metrics(&self) -> &MetricsCache {
        &self.metrics
    }

    pub fn split(&self) -> Option<&DataSplit> {
        self.split.as_ref()
    }

    pub fn cv_results(&self) -> &[CrossValidationReport] {
        &self.cv_results
    }

    pub fn search_outcome(&self) -> Option<&SearchOutcome> {
        self.search.as_ref()
    }

    /// Load a CSV and run the whole pipeline on it
    pub fn run_csv(&mut self, path: impl AsRef<Path>) -> Result<TrainingOutcome> {
        let path = path.as_ref();
        self.input_file = Some(path.display().to_string());
        let df = DataLoader::new().load_csv(path)?;
        self.run(&df)
    }

    /// Run the whole pipeline. Any error aborts before artifacts are written.
    pub fn run(&mut self, df: &DataFrame) -> Result<TrainingOutcome> {
        let start = Instant::now();
        match self.execute(df) {
            Ok(outcome) => {
                info!(
                    model = %outcome.best_model,
                    run_id = %outcome.run_id,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "Training run complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "Training run aborted");
                Err(e)
            }
        }
    }

    fn execute(&mut self, df: &DataFrame) -> Result<TrainingOutcome> {
        self.prepare(df)?;
        self.train_candidates()?;
        self.evaluate_all()?;
        self.cross_validate_candidates()?;

        let ranking = self.select()?;
        if let Some(top) = ranking.first() {
            info!(model = %top.model, score = top.composite_score, "Recommended before optimization");
        }

        if self.config.optimize {
            self.optimize()?;
        }

        let ranking = self.select()?;
        self.persist(ranking)
    }

    /// Validate the config, resolve the target and create the stratified split
    pub fn prepare(&mut self, df: &DataFrame) -> Result<()> {
        self.config.validate()?;
        let target = resolve_target(df, self.config.target.as_deref())?;
        let (features, y) = split_features_target(df, &target)?;

        let split = DataSplit::new(
            &features,
            &y,
            self.config.temp_size,
            self.config.test_share,
            self.config.seed,
        )?;
        let groups = detect_column_types(&split.x_train);
        info!(
            target = %target,
            numeric = groups.numeric.len(),
            categorical = groups.categorical.len(),
            passthrough = groups.passthrough.len(),
            "Feature types detected"
        );

        self.target = Some(target);
        self.split = Some(split);
        self.groups = Some(groups);
        Ok(())
    }

    fn prepared(&self) -> Result<(&DataSplit, &ColumnGroups)> {
        match (&self.split, &self.groups) {
            (Some(split), Some(groups)) => Ok((split, groups)),
            _ => Err(CreditError::TrainingError(
                "prepare must run before training".to_string(),
            )),
        }
    }

    /// Base model descriptions, in candidate order
    pub fn base_specs(&self) -> Vec<ModelSpec> {
        vec![
            ModelSpec::LogisticRegression(LogisticParams {
                max_iter: self.config.max_iter,
                ..LogisticParams::default()
            }),
            ModelSpec::RandomForest(ForestParams {
                n_estimators: self.config.n_estimators,
                ..ForestParams::default()
            }),
        ]
    }

    /// Fit one pipeline per base family on the training partition
    pub fn train_candidates(&mut self) -> Result<()> {
        let specs = self.base_specs();
        let (split, groups) = self.prepared()?;

        let mut fitted = Vec::with_capacity(specs.len());
        for spec in &specs {
            let start = Instant::now();
            let pipeline = CreditPipeline::fit(groups, spec, &split.x_train, &split.y_train, self.config.seed)?;
            info!(
                model = spec.family().label(),
                rows = split.y_train.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Candidate trained"
            );
            fitted.push((spec.family().label(), pipeline));
        }

        for (label, pipeline) in fitted {
            self.candidates.insert(label, pipeline);
        }
        Ok(())
    }

    /// Evaluate every candidate on one partition, replacing its cached table
    pub fn evaluate(&mut self, partition: Partition) -> Result<()> {
        let (split, _) = self.prepared()?;
        let (x, y) = match partition {
            Partition::Train => (&split.x_train, &split.y_train),
            Partition::Validation => (&split.x_val, &split.y_val),
            Partition::Test => (&split.x_test, &split.y_test),
        };
        let table = evaluate_candidates(&self.candidates, x, y, partition)?;
        self.metrics.insert(partition, table);
        Ok(())
    }

    fn evaluate_all(&mut self) -> Result<()> {
        self.evaluate(Partition::Validation)?;
        self.evaluate(Partition::Test)?;
        self.evaluate(Partition::Train)
    }

    /// Stratified k-fold over train + validation for every base candidate
    pub fn cross_validate_candidates(&mut self) -> Result<()> {
        let (split, groups) = self.prepared()?;
        let (x, y) = split.train_and_validation()?;

        let mut reports = Vec::with_capacity(self.candidates.len());
        for (label, pipeline) in self.candidates.iter() {
            reports.push(cross_validate(
                label,
                groups,
                pipeline.spec(),
                &x,
                &y,
                self.config.cv_folds,
                self.config.seed,
            )?);
        }
        self.cv_results = reports;
        Ok(())
    }

    /// Search the validation-best family, register the optimized candidate and
    /// re-evaluate. Returns the new label, or `None` if nothing was optimized.
    pub fn optimize(&mut self) -> Result<Option<String>> {
        let labels: Vec<String> = self.candidates.labels().iter().map(|l| l.to_string()).collect();
        let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let base = best_by_validation_f1(&self.metrics, &label_refs)?.to_string();

        let search = RandomizedSearch::new(
            SearchConfig::new()
                .with_n_iter(self.config.search_iterations)
                .with_cv_folds(self.config.search_cv_folds)
                .with_random_state(self.config.seed)
                .with_max_iter(self.config.max_iter),
        );
        let (split, groups) = self.prepared()?;
        let outcome = match search.optimize(&self.candidates, &base, groups, &split.x_train, &split.y_train)? {
            Some(outcome) => outcome,
            None => return Ok(None),
        };

        let label = outcome.label.clone();
        self.candidates.insert(label.clone(), outcome.pipeline.clone());
        self.search = Some(outcome);

        self.evaluate_all()?;
        self.comparison = Some(compare_base_optimized(&self.metrics, &base, &label)?);
        Ok(Some(label))
    }

    /// Composite ranking of every current candidate
    pub fn select(&self) -> Result<Vec<RankedModel>> {
        let labels = self.candidates.labels();
        rank_models(&self.metrics, &labels)
    }

    fn overfitting(&self) -> Result<Vec<OverfittingRow>> {
        overfitting_analysis(&self.metrics, &self.candidates.labels())
    }

    /// Write the winner, the report and the manifest
    fn persist(&self, ranking: Vec<RankedModel>) -> Result<TrainingOutcome> {
        let (split, _) = self.prepared()?;
        let target = self
            .target
            .clone()
            .ok_or_else(|| CreditError::TrainingError("target not resolved".to_string()))?;
        let best = ranking
            .first()
            .map(|r| r.model.clone())
            .ok_or_else(|| CreditError::TrainingError("no candidate was ranked".to_string()))?;
        let pipeline = self
            .candidates
            .get(&best)
            .ok_or_else(|| CreditError::TrainingError(format!("candidate '{}' vanished", best)))?;

        let run_id = new_run_id();
        let table = |p: Partition| self.metrics.table(p).map(|t| t.to_vec()).unwrap_or_default();

        let report = TrainingReport {
            best_model_name: best.clone(),
            run_id: run_id.clone(),
            input_file: self.input_file.clone(),
            target: target.clone(),
            seed: self.config.seed,
            split_sizes: split.sizes(),
            metrics_validation: table(Partition::Validation),
            metrics_test: table(Partition::Test),
            overfitting_analysis: self.overfitting()?,
            cross_validation: self.cv_results.clone(),
            comparison: ranking,
            optimization: self.search.as_ref().map(|s| OptimizationSummary {
                base_model: s.base_label.clone(),
                optimized_model: s.label.clone(),
                best_params: s.best_params.clone(),
                best_cv_f1: s.best_score,
                study: s.study.clone(),
            }),
            improvement: self.comparison.clone(),
        };

        let artifact = ModelArtifact::new(best.clone(), run_id.clone(), self.config.seed, target, pipeline.clone());
        let (manifest, paths) = ArtifactWriter::new(&self.config.output_dir).write(&artifact, &report)?;

        info!(
            model = %best,
            family = %pipeline.family(),
            model_file = %paths.model.display(),
            metrics_file = %paths.metrics.display(),
            "Artifacts written"
        );

        Ok(TrainingOutcome {
            best_model: best,
            run_id,
            manifest,
            paths,
            report,
        })
    }
}
