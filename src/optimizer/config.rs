//! Randomized search configuration

use serde::{Deserialize, Serialize};

/// Configuration for the randomized hyperparameter search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Parameter sets sampled up front
    pub n_iter: usize,

    /// Stratified folds used to score each trial
    pub cv_folds: usize,

    /// Seed for sampling, fold assignment and the models
    pub random_state: u64,

    /// Solver iteration cap passed to logistic trials
    pub max_iter: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iter: 30,
            cv_folds: 5,
            random_state: 42,
            max_iter: 1000,
        }
    }
}

impl SearchConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set number of sampled parameter sets
    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_max_iter(mut self, n: usize) -> Self {
        self.max_iter = n;
        self
    }
}
