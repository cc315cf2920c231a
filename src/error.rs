//! Error types for the morosidad pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CreditError>;

/// Main error type for training, evaluation and scoring
#[derive(Error, Debug)]
pub enum CreditError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Target column not found: {0}")]
    TargetNotFound(String),

    #[error("Invalid target column '{column}': {reason}")]
    InvalidTarget { column: String, reason: String },

    #[error("Cannot stratify: {0}")]
    Stratification(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Optimization error: {0}")]
    OptimizationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Artifact error: {0}")]
    ArtifactError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Missing metrics: {0}")]
    MissingMetrics(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<polars::error::PolarsError> for CreditError {
    fn from(err: polars::error::PolarsError) -> Self {
        CreditError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CreditError {
    fn from(err: serde_json::Error) -> Self {
        CreditError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CreditError {
    fn from(err: ndarray::ShapeError) -> Self {
        CreditError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CreditError::Stratification("class 1 has 1 member".to_string());
        assert_eq!(err.to_string(), "Cannot stratify: class 1 has 1 member");

        let err = CreditError::InvalidTarget {
            column: "moroso".to_string(),
            reason: "contains nulls".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid target column 'moroso': contains nulls");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CreditError = io_err.into();
        assert!(matches!(err, CreditError::IoError(_)));
    }
}
