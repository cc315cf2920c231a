//! Morosidad - credit-default classification
//!
//! Trains, compares and persists classifiers that predict whether a loan
//! applicant will default, and serves the recommended model over HTTP.
//!
//! # Modules
//!
//! ## Training
//! - [`preprocessing`] - Column typing, imputation, scaling, one-hot encoding
//! - [`training`] - Logistic regression, random forest, splits, CV, selection
//! - [`optimizer`] - Randomized hyperparameter search
//! - [`export`] - Model artifact, metrics report and manifest
//!
//! ## Scoring
//! - [`inference`] - Request validation, risk bands, scoring engine
//! - [`server`] - HTTP API
//!
//! ## Utilities
//! - [`utils`] - Dataset loading and target resolution
//! - [`reporting`] - Dataset profile, correlations, VIF
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Training
pub mod preprocessing;
pub mod training;
pub mod optimizer;
pub mod export;

// Scoring
pub mod inference;
pub mod server;

// Utilities
pub mod utils;
pub mod reporting;
pub mod cli;

pub use error::{CreditError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{CreditError, Result};
    pub use crate::export::{ArtifactWriter, ModelArtifact, ModelManifest, TrainingReport};
    pub use crate::inference::{CreditScorer, PredictionRequest, PredictionResponse, RiskLevel};
    pub use crate::preprocessing::{detect_column_types, ColumnGroups, ColumnPreprocessor};
    pub use crate::training::{
        CreditPipeline, MaxFeatures, ModelFamily, ModelSpec, Partition, TrainEngine,
        TrainingConfig, TrainingOutcome,
    };
    pub use crate::utils::DataLoader;
}
