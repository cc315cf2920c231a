//! Data preprocessing module
//!
//! Column-wise transform fitted on the training partition only:
//! - Numeric columns: median imputation, then standard scaling
//! - Categorical columns: most-frequent imputation, then one-hot encoding
//! - Anything else passes through unchanged
//!
//! Fitted statistics are frozen and reused verbatim for validation, test and
//! inference rows.

mod imputer;
mod scaler;
mod encoder;
mod pipeline;

pub use imputer::{Imputer, ImputeStrategy};
pub use scaler::Scaler;
pub use encoder::OneHotEncoder;
pub use pipeline::ColumnPreprocessor;

use crate::error::{CreditError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// How a feature column is treated by the preprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
    Passthrough,
}

impl ColumnType {
    /// Classify a polars dtype
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
            DataType::Float32 | DataType::Float64 => ColumnType::Numeric,
            DataType::String | DataType::Categorical(_, _) | DataType::Boolean => {
                ColumnType::Categorical
            }
            _ => ColumnType::Passthrough,
        }
    }
}

/// Disjoint column groups, in frame order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnGroups {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub passthrough: Vec<String>,
}

impl ColumnGroups {
    /// Total number of input columns
    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len() + self.passthrough.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All input columns: numeric, categorical, passthrough
    pub fn all_columns(&self) -> impl Iterator<Item = &String> {
        self.numeric
            .iter()
            .chain(self.categorical.iter())
            .chain(self.passthrough.iter())
    }
}

/// Classify every column of the (training) frame by dtype.
pub fn detect_column_types(df: &DataFrame) -> ColumnGroups {
    let mut groups = ColumnGroups::default();
    for col in df.get_columns() {
        let name = col.name().to_string();
        match ColumnType::from_dtype(col.dtype()) {
            ColumnType::Numeric => groups.numeric.push(name),
            ColumnType::Categorical => groups.categorical.push(name),
            ColumnType::Passthrough => groups.passthrough.push(name),
        }
    }
    groups
}

/// Column values as f64; nulls and NaN become `None`.
pub(crate) fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| CreditError::FeatureNotFound(name.to_string()))?;
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| CreditError::PreprocessingError(format!("column '{}': {}", name, e)))?;
    let ca = casted.f64()?;
    Ok(ca
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Column values as strings; nulls become `None`.
pub(crate) fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| CreditError::FeatureNotFound(name.to_string()))?;
    let casted = column
        .cast(&DataType::String)
        .map_err(|e| CreditError::PreprocessingError(format!("column '{}': {}", name, e)))?;
    let ca = casted.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}
