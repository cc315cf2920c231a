//! Scoring engine
//!
//! Wraps a loaded [`ModelArtifact`] and turns validated applicant records
//! into labelled, risk-banded predictions. Counters are kept in memory for
//! the lifetime of the scorer; reloading a model starts them from zero.

use super::request::{PredictionRequest, REQUIRED_FIELDS};
use super::risk::{recommendation, RiskLevel};
use crate::error::{CreditError, Result};
use crate::export::{ModelArtifact, ModelManifest};
use crate::training::ModelSpec;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Scored applicant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// 1 = default
    pub prediction: u8,
    pub prediction_label: String,
    pub probability_no_default: f64,
    pub probability_default: f64,
    pub risk_level: RiskLevel,
    pub recommendation: String,
    pub model: String,
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Counters since the scorer was loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionStats {
    pub total: u64,
    pub defaults: u64,
    pub non_defaults: u64,
    pub mean_probability_default: f64,
    pub last_prediction: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct StatsAccumulator {
    total: u64,
    defaults: u64,
    probability_sum: f64,
    last_prediction: Option<DateTime<Utc>>,
}

impl StatsAccumulator {
    fn record(&mut self, response: &PredictionResponse) {
        self.total += 1;
        if response.prediction == 1 {
            self.defaults += 1;
        }
        self.probability_sum += response.probability_default;
        self.last_prediction = Some(response.timestamp);
    }

    fn snapshot(&self) -> PredictionStats {
        PredictionStats {
            total: self.total,
            defaults: self.defaults,
            non_defaults: self.total - self.defaults,
            mean_probability_default: if self.total > 0 {
                self.probability_sum / self.total as f64
            } else {
                0.0
            },
            last_prediction: self.last_prediction,
        }
    }
}

/// Description of the loaded model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub target: String,
    pub feature_columns: Vec<String>,
    pub spec: ModelSpec,
    /// Manifest version; absent when loaded straight from an artifact
    pub manifest_version: Option<u64>,
    pub sha256: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

/// A loaded model ready to score requests
#[derive(Debug)]
pub struct CreditScorer {
    artifact: ModelArtifact,
    manifest: Option<ModelManifest>,
    loaded_at: DateTime<Utc>,
    stats: Mutex<StatsAccumulator>,
}

impl CreditScorer {
    /// Wrap an artifact. Fails if the model needs columns a request cannot carry.
    pub fn new(artifact: ModelArtifact) -> Result<Self> {
        let unsupported: Vec<&str> = artifact
            .feature_columns
            .iter()
            .map(String::as_str)
            .filter(|c| !REQUIRED_FIELDS.contains(c))
            .collect();
        if !unsupported.is_empty() {
            return Err(CreditError::ArtifactError(format!(
                "model '{}' expects columns not present in scoring requests: {}",
                artifact.name,
                unsupported.join(", ")
            )));
        }

        Ok(Self {
            artifact,
            manifest: None,
            loaded_at: Utc::now(),
            stats: Mutex::new(StatsAccumulator::default()),
        })
    }

    /// Load whatever model `dir/manifest.json` points at, checksum verified
    pub fn from_manifest(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let start = Instant::now();
        let manifest = ModelManifest::load(dir)?;
        let artifact = manifest.load_model(dir)?;

        let mut scorer = Self::new(artifact)?;
        info!(
            model = %manifest.model_name,
            run_id = %manifest.run_id,
            version = manifest.version,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model loaded"
        );
        scorer.manifest = Some(manifest);
        Ok(scorer)
    }

    pub fn name(&self) -> &str {
        &self.artifact.name
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn manifest(&self) -> Option<&ModelManifest> {
        self.manifest.as_ref()
    }

    /// Score one validated record
    pub fn score(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let frame = request.to_frame()?;
        let proba = self.artifact.pipeline.predict_proba(&frame)?;
        let p_default = proba.get(0).copied().ok_or_else(|| {
            CreditError::EvaluationError("model returned no probability".to_string())
        })?;

        let prediction = u8::from(p_default > 0.5);
        let response = PredictionResponse {
            prediction,
            prediction_label: if prediction == 1 { "DEFAULT" } else { "NO DEFAULT" }.to_string(),
            probability_no_default: 1.0 - p_default,
            probability_default: p_default,
            risk_level: RiskLevel::from_probability(p_default),
            recommendation: recommendation(prediction, p_default).to_string(),
            model: self.artifact.name.clone(),
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };

        self.stats.lock().record(&response);
        debug!(
            request_id = %response.request_id,
            probability_default = p_default,
            risk = %response.risk_level,
            "Request scored"
        );
        Ok(response)
    }

    pub fn stats(&self) -> PredictionStats {
        self.stats.lock().snapshot()
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.artifact.name.clone(),
            run_id: self.artifact.run_id.clone(),
            created_at: self.artifact.created_at,
            target: self.artifact.target.clone(),
            feature_columns: self.artifact.feature_columns.clone(),
            spec: self.artifact.pipeline.spec().clone(),
            manifest_version: self.manifest.as_ref().map(|m| m.version),
            sha256: self.manifest.as_ref().map(|m| m.sha256.clone()),
            loaded_at: self.loaded_at,
        }
    }
}
