//! Model training module
//!
//! Provides the training side of the credit-default pipeline:
//! - Logistic regression (L1 / L2 / elastic-net, accelerated proximal gradient)
//! - Decision trees and Random Forests (weighted Gini, bootstrap)
//! - Stratified splitting and k-fold cross-validation
//! - Evaluation, composite selection and the orchestrating [`TrainEngine`]

mod config;
mod engine;
pub mod cross_validation;
pub mod decision_tree;
pub mod evaluation;
pub mod linear_models;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod random_forest;
pub mod selection;
pub mod split;

pub use config::TrainingConfig;
pub use cross_validation::{cross_validate, CVResults, CVSplit, CrossValidationReport, CrossValidator};
pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::{TrainEngine, TrainingOutcome};
pub use evaluation::{evaluate_candidates, MetricsCache, ModelEvaluation, OverfittingRow, Partition};
pub use linear_models::{LogisticRegression, Penalty};
pub use metrics::{roc_auc, ClassificationMetrics, ConfusionCounts};
pub use models::{Classifier, ClassWeight, ForestParams, LogisticParams, Model, ModelFamily, ModelSpec};
pub use pipeline::{CandidateSet, CreditPipeline};
pub use random_forest::{MaxFeatures, RandomForest};
pub use selection::{composite_score, rank_models, ModelComparison, RankedModel};
pub use split::{DataSplit, SplitSizes};
