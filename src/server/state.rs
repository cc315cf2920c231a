//! Application state management

use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{CreditError, Result};
use crate::inference::CreditScorer;

use super::ServerConfig;

/// Application state shared across handlers.
///
/// The scorer is swapped as a whole on reload, so a request sees either the
/// old model or the new one, never a mix.
pub struct AppState {
    pub config: ServerConfig,
    scorer: RwLock<Option<Arc<CreditScorer>>>,
}

impl AppState {
    /// State without a model; scoring answers 503 until a reload succeeds
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            scorer: RwLock::new(None),
        }
    }

    /// State with an already loaded scorer
    pub fn with_scorer(config: ServerConfig, scorer: CreditScorer) -> Self {
        Self {
            config,
            scorer: RwLock::new(Some(Arc::new(scorer))),
        }
    }

    /// Try the manifest in `config.models_dir`; start empty if it cannot be loaded
    pub fn load(config: ServerConfig) -> Self {
        match CreditScorer::from_manifest(&config.models_dir) {
            Ok(scorer) => Self::with_scorer(config, scorer),
            Err(e) => {
                warn!(
                    models_dir = %config.models_dir,
                    error = %e,
                    "No model loaded, scoring is unavailable until a reload succeeds"
                );
                Self::new(config)
            }
        }
    }

    /// Current scorer, if any
    pub async fn scorer(&self) -> Option<Arc<CreditScorer>> {
        self.scorer.read().await.clone()
    }

    /// Load the manifest model and swap it in. On error the previous scorer stays.
    pub async fn reload(&self) -> Result<Arc<CreditScorer>> {
        let dir = self.config.models_dir.clone();
        let loaded = tokio::task::spawn_blocking(move || CreditScorer::from_manifest(Path::new(&dir)))
            .await
            .map_err(|e| CreditError::ArtifactError(format!("reload task failed: {}", e)))??;

        let scorer = Arc::new(loaded);
        *self.scorer.write().await = Some(Arc::clone(&scorer));
        info!(model = %scorer.name(), "Model swapped in");
        Ok(scorer)
    }
}
