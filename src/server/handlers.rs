//! HTTP request handlers

use std::collections::BTreeMap;
use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::inference::{
    PredictionRequest, PredictionResponse, CATEGORICAL_OPTIONS, NUMERIC_FIELDS, REQUIRED_FIELDS,
};

use super::error::{Result, ServerError};
use super::state::AppState;

const NO_MODEL: &str = "No model is loaded. Train a model first or call /api/model/reload.";

// ============================================================================
// Scoring
// ============================================================================

/// Score one applicant
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let scorer = state
        .scorer()
        .await
        .ok_or_else(|| ServerError::ModelUnavailable(NO_MODEL.to_string()))?;

    let Json(body) = body.map_err(|e| ServerError::BadRequest(format!("Invalid JSON body: {}", e.body_text())))?;
    let request = PredictionRequest::from_json(&body).map_err(|e| {
        warn!(error = %e, "Rejected scoring request");
        ServerError::from(e)
    })?;

    let response = scorer.score(&request)?;
    info!(
        request_id = %response.request_id,
        prediction = response.prediction,
        risk = %response.risk_level,
        "Prediction served"
    );
    Ok(Json(response))
}

// ============================================================================
// Model
// ============================================================================

/// Details of the active model
pub async fn get_model(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let scorer = state
        .scorer()
        .await
        .ok_or_else(|| ServerError::ModelUnavailable(NO_MODEL.to_string()))?;

    Ok(Json(json!({
        "model": scorer.info(),
        "manifest": scorer.manifest(),
    })))
}

/// Re-read the manifest and swap the active model
pub async fn reload_model(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    match state.reload().await {
        Ok(scorer) => Ok(Json(json!({
            "success": true,
            "model": scorer.info(),
        }))),
        Err(e) => {
            warn!(error = %e, "Model reload failed, keeping the previous model");
            Err(ServerError::ModelUnavailable(format!(
                "Reload failed: {}. The previous model remains active.",
                e
            )))
        }
    }
}

// ============================================================================
// Reference data
// ============================================================================

/// Documented categorical values and required fields
pub async fn get_options() -> Json<Value> {
    let categorical: BTreeMap<&str, &[&str]> = CATEGORICAL_OPTIONS.iter().copied().collect();
    Json(json!({
        "categorical_options": categorical,
        "numeric_fields": NUMERIC_FIELDS,
        "required_fields": REQUIRED_FIELDS,
    }))
}

/// Prediction counters since the active model was loaded
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.scorer().await {
        Some(scorer) => Json(json!({
            "model": scorer.name(),
            "stats": scorer.stats(),
        })),
        None => Json(json!({
            "model": Value::Null,
            "stats": crate::inference::PredictionStats::default(),
        })),
    }
}

// ============================================================================
// System
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.scorer().await.is_some(),
    }))
}
