//! Missing value imputation

use crate::error::{CreditError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the median (numeric only)
    Median,
    /// Replace with the most frequent value
    MostFrequent,
}

/// Value used to fill a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ImputeValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, ImputeValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the given strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    /// Learn the fill value of a numeric column.
    ///
    /// A column with no observed values falls back to 0.0.
    pub fn fit_numeric(&mut self, column: &str, values: &[Option<f64>]) -> &mut Self {
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        let fill = match self.strategy {
            ImputeStrategy::Median => median(observed),
            ImputeStrategy::MostFrequent => most_frequent_numeric(&observed),
        };
        if fill.is_none() {
            tracing::warn!(column, "Column has no observed values, imputing 0.0");
        }
        self.fill_values
            .insert(column.to_string(), ImputeValue::Numeric(fill.unwrap_or(0.0)));
        self.is_fitted = true;
        self
    }

    /// Learn the fill value of a categorical column.
    pub fn fit_categorical(&mut self, column: &str, values: &[Option<String>]) -> Result<&mut Self> {
        if self.strategy != ImputeStrategy::MostFrequent {
            return Err(CreditError::PreprocessingError(format!(
                "{:?} imputation is not defined for categorical column '{}'",
                self.strategy, column
            )));
        }
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_insert(0) += 1;
        }
        // BTreeMap iterates in lexicographic order, so ties keep the smallest value
        let mut mode: Option<(&str, usize)> = None;
        for (value, count) in counts {
            if mode.map_or(true, |(_, best)| count > best) {
                mode = Some((value, count));
            }
        }
        let fill = mode.map(|(value, _)| value.to_string()).unwrap_or_default();
        self.fill_values
            .insert(column.to_string(), ImputeValue::String(fill));
        self.is_fitted = true;
        Ok(self)
    }

    /// Fill missing numeric values
    pub fn transform_numeric(&self, column: &str, values: &[Option<f64>]) -> Result<Vec<f64>> {
        match self.fill_value(column)? {
            ImputeValue::Numeric(fill) => Ok(values.iter().map(|v| v.unwrap_or(*fill)).collect()),
            ImputeValue::String(_) => Err(CreditError::PreprocessingError(format!(
                "column '{}' was fitted as categorical",
                column
            ))),
        }
    }

    /// Fill missing categorical values
    pub fn transform_categorical(&self, column: &str, values: &[Option<String>]) -> Result<Vec<String>> {
        match self.fill_value(column)? {
            ImputeValue::String(fill) => Ok(values
                .iter()
                .map(|v| v.clone().unwrap_or_else(|| fill.clone()))
                .collect()),
            ImputeValue::Numeric(_) => Err(CreditError::PreprocessingError(format!(
                "column '{}' was fitted as numeric",
                column
            ))),
        }
    }

    /// Numeric fill value of a fitted column
    pub fn numeric_fill(&self, column: &str) -> Option<f64> {
        match self.fill_values.get(column) {
            Some(ImputeValue::Numeric(v)) => Some(*v),
            _ => None,
        }
    }

    /// Categorical fill value of a fitted column
    pub fn categorical_fill(&self, column: &str) -> Option<&str> {
        match self.fill_values.get(column) {
            Some(ImputeValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    fn fill_value(&self, column: &str) -> Result<&ImputeValue> {
        if !self.is_fitted {
            return Err(CreditError::ModelNotFitted);
        }
        self.fill_values
            .get(column)
            .ok_or_else(|| CreditError::FeatureNotFound(column.to_string()))
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn most_frequent_numeric(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if best.map_or(true, |(_, count)| j - i > count) {
            best = Some((sorted[i], j - i));
        }
        i = j;
    }
    best.map(|(value, _)| value)
}
