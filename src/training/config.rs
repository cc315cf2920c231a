//! Training run configuration

use crate::error::{CreditError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Target column; required before a run starts
    pub target: Option<String>,

    /// Seed shared by the split, both model families, CV and the search
    pub seed: u64,

    /// Fraction of rows held out for validation + test
    pub temp_size: f64,

    /// Share of the holdout that goes to test
    pub test_share: f64,

    /// Folds for the cross-validation report
    pub cv_folds: usize,

    /// Parameter sets sampled by the randomized search
    pub search_iterations: usize,

    /// Folds used to score each search trial
    pub search_cv_folds: usize,

    /// Iteration cap of the logistic regression solver
    pub max_iter: usize,

    /// Trees in the base random forest
    pub n_estimators: usize,

    /// Run the hyperparameter search
    pub optimize: bool,

    /// Directory receiving model, metrics and manifest
    pub output_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target: None,
            seed: 42,
            temp_size: 0.30,
            test_share: 0.50,
            cv_folds: 5,
            search_iterations: 30,
            search_cv_folds: 5,
            max_iter: 1000,
            n_estimators: 100,
            optimize: true,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            CreditError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_search_iterations(mut self, n: usize) -> Self {
        self.search_iterations = n;
        self
    }

    pub fn with_search_cv_folds(mut self, folds: usize) -> Self {
        self.search_cv_folds = folds;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_iter(mut self, n: usize) -> Self {
        self.max_iter = n;
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Reject values no run could use
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("temp_size", self.temp_size), ("test_share", self.test_share)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(CreditError::ConfigError(format!(
                    "{} must be in (0, 1), got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [("cv_folds", self.cv_folds), ("search_cv_folds", self.search_cv_folds)] {
            if value < 2 {
                return Err(CreditError::ConfigError(format!(
                    "{} must be at least 2, got {}",
                    name, value
                )));
            }
        }
        if self.optimize && self.search_iterations == 0 {
            return Err(CreditError::ConfigError(
                "search_iterations must be at least 1 when optimizing".to_string(),
            ));
        }
        if self.n_estimators == 0 || self.max_iter == 0 {
            return Err(CreditError::ConfigError(
                "n_estimators and max_iter must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.search_iterations, 30);
        assert!(config.optimize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = TrainingConfig::new()
            .with_target("moroso")
            .with_seed(7)
            .with_optimize(false)
            .with_output_dir("/tmp/out");

        assert_eq!(config.target.as_deref(), Some("moroso"));
        assert_eq!(config.seed, 7);
        assert!(!config.optimize);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"seed": 3, "cv_folds": 3}"#).unwrap();

        let config = TrainingConfig::from_json_file(&path).unwrap();
        assert_eq!(config.seed, 3);
        assert_eq!(config.cv_folds, 3);
        assert_eq!(config.search_iterations, 30);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TrainingConfig::new().with_cv_folds(1).validate().is_err());
        let mut config = TrainingConfig::new();
        config.temp_size = 1.0;
        assert!(config.validate().is_err());
    }
}
