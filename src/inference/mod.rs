//! Inference module
//!
//! Scores single applicant records with a persisted pipeline:
//! - Request validation (required fields, numeric coercion)
//! - Risk bands and lending recommendations
//! - In-memory prediction counters

mod engine;
mod request;
mod risk;

pub use engine::{CreditScorer, ModelInfo, PredictionResponse, PredictionStats};
pub use request::{
    PredictionRequest, RequestError, CATEGORICAL_FIELDS, CATEGORICAL_OPTIONS, NUMERIC_FIELDS,
    REQUIRED_FIELDS,
};
pub use risk::{recommendation, RiskLevel};
