//! Persisted model artifact

use super::manifest::write_atomic;
use crate::error::{CreditError, Result};
use crate::training::pipeline::CreditPipeline;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The winning pipeline plus what is needed to score with it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Candidate label, e.g. "Random Forest (optimized)"
    pub name: String,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    pub target: String,
    /// Raw input columns the pipeline expects
    pub feature_columns: Vec<String>,
    /// Crate version that wrote the artifact
    pub version: String,
    pub pipeline: CreditPipeline,
}

impl ModelArtifact {
    pub fn new(
        name: impl Into<String>,
        run_id: impl Into<String>,
        seed: u64,
        target: impl Into<String>,
        pipeline: CreditPipeline,
    ) -> Self {
        let feature_columns = pipeline.preprocessor().groups().all_columns().cloned().collect();
        Self {
            name: name.into(),
            run_id: run_id.into(),
            created_at: Utc::now(),
            seed,
            target: target.into(),
            feature_columns,
            version: env!("CARGO_PKG_VERSION").to_string(),
            pipeline,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Write the artifact through a temp file + rename
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_atomic(path.as_ref(), &self.to_bytes()?)
    }

    /// Read an artifact; the pipeline is restored as fitted, never refit
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            CreditError::ArtifactError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        if !artifact.pipeline.preprocessor().is_fitted() {
            return Err(CreditError::ArtifactError(
                "artifact holds an unfitted preprocessor".to_string(),
            ));
        }
        Ok(artifact)
    }
}
