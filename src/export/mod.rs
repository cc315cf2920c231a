//! Model export
//!
//! Provides the persisted artifacts of a training run:
//! - JSON model artifact (fitted preprocessing + classifier)
//! - JSON metrics report
//! - Manifest naming the active model, with its SHA-256 and a version counter

mod artifact;
mod manifest;
mod report;

pub use artifact::ModelArtifact;
pub use manifest::{
    compute_sha256, write_atomic, ArtifactPaths, ArtifactWriter, ModelManifest, MANIFEST_FILE,
};
pub use report::{OptimizationSummary, TrainingReport};
