//! One-hot encoding of categorical columns

use crate::error::{CreditError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One-hot encoder; categories not seen during fit encode as all zeros
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: HashMap<String, Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the sorted vocabulary of one column (values already imputed)
    pub fn fit_column(&mut self, column: &str, values: &[String]) -> &mut Self {
        let vocabulary: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        self.categories.insert(
            column.to_string(),
            vocabulary.into_iter().map(str::to_string).collect(),
        );
        self.is_fitted = true;
        self
    }

    /// Fitted categories of a column, sorted
    pub fn categories(&self, column: &str) -> Result<&[String]> {
        if !self.is_fitted {
            return Err(CreditError::ModelNotFitted);
        }
        self.categories
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| CreditError::FeatureNotFound(column.to_string()))
    }

    /// Position of the indicator set for `value`, `None` when unseen
    pub fn index_of(&self, column: &str, value: &str) -> Result<Option<usize>> {
        let categories = self.categories(column)?;
        Ok(categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok())
    }

    /// Indicator column names, `"{column}_{category}"`
    pub fn feature_names(&self, column: &str) -> Result<Vec<String>> {
        Ok(self
            .categories(column)?
            .iter()
            .map(|c| format!("{}_{}", column, c))
            .collect())
    }
}
