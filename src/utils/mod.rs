//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    resolve_target, split_features_target, suggest_target_columns, target_vector, DataLoader,
};
