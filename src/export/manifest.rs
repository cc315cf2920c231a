//! Manifest pointing at the active model and metrics files
//!
//! The manifest is the only thing a server reads to find a model. It is
//! replaced atomically, and only after the files it names are on disk.

use super::artifact::ModelArtifact;
use super::report::TrainingReport;
use crate::error::{CreditError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the manifest inside a models directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Pointer to the current model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Model file name, relative to the manifest's directory
    pub model_file: String,
    /// Metrics file name, relative to the manifest's directory
    pub metrics_file: String,
    pub model_name: String,
    pub run_id: String,
    /// Hex SHA-256 of the model file
    pub sha256: String,
    pub created_at: DateTime<Utc>,
    /// Incremented on every successful run in this directory
    pub version: u64,
}

impl ModelManifest {
    /// Read `manifest.json` from `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(MANIFEST_FILE);
        let raw = fs::read(&path).map_err(|e| {
            CreditError::ArtifactError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Load the model the manifest names, verifying its checksum
    pub fn load_model(&self, dir: impl AsRef<Path>) -> Result<ModelArtifact> {
        let path = dir.as_ref().join(&self.model_file);
        let bytes = fs::read(&path).map_err(|e| {
            CreditError::ArtifactError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let actual = compute_sha256(&bytes);
        if actual != self.sha256 {
            return Err(CreditError::ArtifactError(format!(
                "checksum mismatch for {}: manifest {}, file {}",
                self.model_file, self.sha256, actual
            )));
        }
        ModelArtifact::from_bytes(&bytes)
    }
}

/// Compute SHA-256 hash of data
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Write `bytes` to a temp file next to `path`, sync it and rename it into place
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| CreditError::ArtifactError(format!("not a file path: {}", path.display())))?;
    let tmp = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));

    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(CreditError::ArtifactError(format!(
            "failed to write {}: {}",
            path.display(),
            e
        )));
    }
    Ok(())
}

/// Paths written by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub metrics: PathBuf,
    pub manifest: PathBuf,
}

/// Writes model, metrics and manifest into one directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist both artifacts, then point the manifest at them
    pub fn write(&self, artifact: &ModelArtifact, report: &TrainingReport) -> Result<(ModelManifest, ArtifactPaths)> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CreditError::ArtifactError(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let model_file = format!("model_{}.json", artifact.run_id);
        let metrics_file = format!("training_results_{}.json", artifact.run_id);
        let model_path = self.dir.join(&model_file);
        let metrics_path = self.dir.join(&metrics_file);
        let manifest_path = self.dir.join(MANIFEST_FILE);

        let model_bytes = artifact.to_bytes()?;
        write_atomic(&model_path, &model_bytes)?;
        write_atomic(&metrics_path, &serde_json::to_vec_pretty(report)?)?;

        let version = match ModelManifest::load(&self.dir) {
            Ok(previous) => previous.version + 1,
            Err(_) => 1,
        };
        let manifest = ModelManifest {
            model_file,
            metrics_file,
            model_name: artifact.name.clone(),
            run_id: artifact.run_id.clone(),
            sha256: compute_sha256(&model_bytes),
            created_at: Utc::now(),
            version,
        };
        write_atomic(&manifest_path, &serde_json::to_vec_pretty(&manifest)?)?;

        info!(
            model = %manifest.model_name,
            version = manifest.version,
            dir = %self.dir.display(),
            "Manifest updated"
        );

        Ok((
            manifest,
            ArtifactPaths {
                model: model_path,
                metrics: metrics_path,
                manifest: manifest_path,
            },
        ))
    }
}
