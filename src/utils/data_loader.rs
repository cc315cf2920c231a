//! Dataset loading and target resolution

use crate::error::{CreditError, Result};
use ndarray::Array1;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Substrings that mark a column as a likely default flag.
const TARGET_HINTS: [&str; 3] = ["default", "moros", "incumpl"];

/// Rows used to infer column types
const INFER_SCHEMA_ROWS: usize = 1000;

/// CSV loader for applicant datasets
#[derive(Debug, Default)]
pub struct DataLoader;

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path)
            .map_err(|e| CreditError::DataError(format!("{}: {}", path.display(), e)))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| CreditError::DataError(e.to_string()))?;

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dataset loaded"
        );
        Ok(df)
    }
}

/// Columns whose name suggests a default flag, in frame order.
pub fn suggest_target_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| {
            let lower = name.to_lowercase();
            TARGET_HINTS.iter().any(|hint| lower.contains(hint))
        })
        .collect()
}

/// Resolve the target column.
///
/// An explicit name must exist in the frame. Without one, the name heuristic
/// only produces a suggestion inside the error; it is never applied silently.
pub fn resolve_target(df: &DataFrame, explicit: Option<&str>) -> Result<String> {
    if let Some(name) = explicit {
        if df.column(name).is_err() {
            let suggestions = suggest_target_columns(df);
            return Err(CreditError::TargetNotFound(if suggestions.is_empty() {
                name.to_string()
            } else {
                format!("{} (candidates: {})", name, suggestions.join(", "))
            }));
        }
        return Ok(name.to_string());
    }

    let suggestions = suggest_target_columns(df);
    if suggestions.len() > 1 {
        warn!(candidates = ?suggestions, "Several columns look like a default flag");
    }
    let message = if suggestions.is_empty() {
        "no target given and no column looks like a default flag".to_string()
    } else {
        format!(
            "no target given; pass one explicitly (candidates: {})",
            suggestions.join(", ")
        )
    };
    Err(CreditError::TargetNotFound(message))
}

/// Extract the binary target as 0.0 / 1.0 values.
pub fn target_vector(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    let column = df
        .column(target)
        .map_err(|_| CreditError::TargetNotFound(target.to_string()))?;

    let invalid = |reason: &str| CreditError::InvalidTarget {
        column: target.to_string(),
        reason: reason.to_string(),
    };

    match column.dtype() {
        DataType::Boolean
        | DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        | DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        | DataType::Float32 | DataType::Float64 => {}
        other => return Err(invalid(&format!("unsupported dtype {:?}", other))),
    }

    if column.null_count() > 0 {
        return Err(invalid(&format!("{} missing values", column.null_count())));
    }

    let casted = column.cast(&DataType::Float64)?;
    let mut values = Vec::with_capacity(casted.len());
    for value in casted.f64()?.into_iter() {
        match value {
            Some(v) if v == 0.0 || v == 1.0 => values.push(v),
            Some(v) => return Err(invalid(&format!("value {} is not 0 or 1", v))),
            None => return Err(invalid("missing value")),
        }
    }

    let positives = values.iter().filter(|&&v| v == 1.0).count();
    if positives == 0 || positives == values.len() {
        return Err(invalid("both classes must be present"));
    }

    Ok(Array1::from_vec(values))
}

/// Split a frame into feature columns and the binary target.
pub fn split_features_target(df: &DataFrame, target: &str) -> Result<(DataFrame, Array1<f64>)> {
    let y = target_vector(df, target)?;
    let features = df.drop(target)?;
    if features.width() == 0 {
        return Err(CreditError::DataError("dataset has no feature columns".to_string()));
    }
    Ok((features, y))
}
