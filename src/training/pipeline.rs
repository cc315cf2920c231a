//! Preprocessing + classifier bundle

use super::models::{Classifier, Model, ModelFamily, ModelSpec};
use crate::error::{CreditError, Result};
use crate::preprocessing::{ColumnGroups, ColumnPreprocessor};
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// A fitted preprocessing transform followed by a fitted classifier.
///
/// The preprocessor is fit once, on the rows passed to [`CreditPipeline::fit`],
/// and only applied afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditPipeline {
    preprocessor: ColumnPreprocessor,
    model: Classifier,
    spec: ModelSpec,
}

impl CreditPipeline {
    /// Fit a fresh pipeline on `x` / `y`
    pub fn fit(
        groups: &ColumnGroups,
        spec: &ModelSpec,
        x: &DataFrame,
        y: &Array1<f64>,
        seed: u64,
    ) -> Result<Self> {
        let start = Instant::now();
        if x.height() != y.len() {
            return Err(CreditError::ShapeError {
                expected: format!("{} labels", x.height()),
                actual: format!("{} labels", y.len()),
            });
        }

        let mut preprocessor = ColumnPreprocessor::new(groups.clone());
        let matrix = preprocessor.fit_transform(x)?;
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(CreditError::PreprocessingError(
                "passthrough columns produced missing or non-finite values".to_string(),
            ));
        }

        let mut model = spec.build(seed)?;
        model.fit(&matrix, y)?;

        debug!(
            family = %spec.family(),
            rows = x.height(),
            features = matrix.ncols(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline fitted"
        );

        Ok(Self {
            preprocessor,
            model,
            spec: spec.clone(),
        })
    }

    /// P(class 1) for every row
    pub fn predict_proba(&self, x: &DataFrame) -> Result<Array1<f64>> {
        let matrix = self.preprocessor.transform(x)?;
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(CreditError::PreprocessingError(
                "input produced missing or non-finite feature values".to_string(),
            ));
        }
        self.model.predict_proba(&matrix)
    }

    /// Hard labels, 1 iff P(1) > 0.5
    pub fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn family(&self) -> ModelFamily {
        self.model.family()
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn preprocessor(&self) -> &ColumnPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &Classifier {
        &self.model
    }

    pub fn feature_names(&self) -> &[String] {
        self.preprocessor.feature_names()
    }
}

/// Fitted pipelines by label, in insertion order.
///
/// Insertion order is the tie-break wherever candidates are ranked.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    entries: Vec<(String, CreditPipeline)>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate; an existing label keeps its position and gets the new pipeline
    pub fn insert(&mut self, label: impl Into<String>, pipeline: CreditPipeline) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = pipeline,
            None => self.entries.push((label, pipeline)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&CreditPipeline> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, p)| p)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(l, _)| l.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CreditPipeline)> {
        self.entries.iter().map(|(l, p)| (l.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
