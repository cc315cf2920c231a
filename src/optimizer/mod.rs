//! Hyperparameter optimization
//!
//! Randomized search over the parameter distributions of a candidate's model
//! family, scored by mean F1 under stratified k-fold cross-validation.

mod config;
mod optimizer;
mod search_space;

pub use config::SearchConfig;
pub use optimizer::{
    search_space_for, spec_from_params, RandomizedSearch, SearchOutcome, Study, TrialResult,
};
pub use search_space::{Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};
