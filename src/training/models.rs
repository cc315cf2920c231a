//! Shared model trait and the candidate model families

use crate::error::{CreditError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::linear_models::{LogisticRegression, Penalty};
use super::random_forest::{MaxFeatures, RandomForest};

/// Class weighting scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassWeight {
    /// Every row weighs 1
    Uniform,
    /// w_k = n / (2 * n_k)
    Balanced,
}

impl ClassWeight {
    /// Per-class weights `[w_0, w_1]` for binary labels
    pub fn class_weights(&self, y: &Array1<f64>) -> [f64; 2] {
        match self {
            ClassWeight::Uniform => [1.0, 1.0],
            ClassWeight::Balanced => {
                let n = y.len() as f64;
                let positives = y.iter().filter(|&&v| v > 0.5).count() as f64;
                let negatives = n - positives;
                let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 0.0 };
                [weight(negatives), weight(positives)]
            }
        }
    }

    /// Per-row weights
    pub fn sample_weights(&self, y: &Array1<f64>) -> Array1<f64> {
        let [w0, w1] = self.class_weights(y);
        y.mapv(|v| if v > 0.5 { w1 } else { w0 })
    }
}

/// Trait for binary classifiers producing P(class 1)
pub trait Model: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Probability of the positive (default) class for every row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard labels: 1 iff P(1) > 0.5
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    fn is_fitted(&self) -> bool;
}

/// Validate shapes, finiteness and binary labels before fitting
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(CreditError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(CreditError::TrainingError(format!(
            "empty training matrix ({} x {})",
            x.nrows(),
            x.ncols()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(CreditError::TrainingError(
            "feature matrix contains non-finite values".to_string(),
        ));
    }
    if y.iter().any(|&v| v != 0.0 && v != 1.0) {
        return Err(CreditError::TrainingError(
            "labels must be 0 or 1".to_string(),
        ));
    }
    Ok(())
}

/// Model family of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    LogisticRegression,
    RandomForest,
}

impl ModelFamily {
    /// Label used for the base candidate of this family
    pub fn label(&self) -> &'static str {
        match self {
            ModelFamily::LogisticRegression => "Logistic Regression",
            ModelFamily::RandomForest => "Random Forest",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Logistic regression hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub penalty: Penalty,
    /// Inverse regularization strength
    pub c: f64,
    /// Elastic-net mixing, only read when `penalty` is `ElasticNet`
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub class_weight: ClassWeight,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            penalty: Penalty::L2,
            c: 1.0,
            l1_ratio: 0.5,
            max_iter: 1000,
            tol: 1e-4,
            class_weight: ClassWeight::Balanced,
        }
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::Balanced,
        }
    }
}

/// Unfitted model description: a family plus its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "params")]
pub enum ModelSpec {
    LogisticRegression(LogisticParams),
    RandomForest(ForestParams),
}

impl ModelSpec {
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelSpec::LogisticRegression(_) => ModelFamily::LogisticRegression,
            ModelSpec::RandomForest(_) => ModelFamily::RandomForest,
        }
    }

    /// Build an unfitted classifier seeded with `seed`
    pub fn build(&self, seed: u64) -> Result<Classifier> {
        match self {
            ModelSpec::LogisticRegression(p) => {
                let model = LogisticRegression::new()
                    .with_penalty(p.penalty)
                    .with_c(p.c)?
                    .with_l1_ratio(p.l1_ratio)?
                    .with_max_iter(p.max_iter)
                    .with_tol(p.tol)
                    .with_class_weight(p.class_weight);
                Ok(Classifier::LogisticRegression(model))
            }
            ModelSpec::RandomForest(p) => {
                if p.n_estimators == 0 {
                    return Err(CreditError::InvalidParameter {
                        name: "n_estimators".to_string(),
                        value: "0".to_string(),
                        reason: "must be at least 1".to_string(),
                    });
                }
                let mut model = RandomForest::new_classifier(p.n_estimators)
                    .with_min_samples_split(p.min_samples_split)
                    .with_min_samples_leaf(p.min_samples_leaf)
                    .with_max_features(p.max_features)
                    .with_bootstrap(p.bootstrap)
                    .with_class_weight(p.class_weight)
                    .with_random_state(seed);
                if let Some(depth) = p.max_depth {
                    model = model.with_max_depth(depth);
                }
                Ok(Classifier::RandomForest(model))
            }
        }
    }
}

/// A classifier of one of the supported families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl Classifier {
    pub fn family(&self) -> ModelFamily {
        match self {
            Classifier::LogisticRegression(_) => ModelFamily::LogisticRegression,
            Classifier::RandomForest(_) => ModelFamily::RandomForest,
        }
    }
}

impl Model for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::LogisticRegression(m) => m.fit(x, y).map(|_| ()),
            Classifier::RandomForest(m) => m.fit(x, y).map(|_| ()),
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::LogisticRegression(m) => m.predict_proba(x),
            Classifier::RandomForest(m) => m.predict_proba(x),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            Classifier::LogisticRegression(m) => m.is_fitted,
            Classifier::RandomForest(m) => m.is_fitted(),
        }
    }
}
