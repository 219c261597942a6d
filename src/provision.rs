//! One-time provisioning of the model artifact.
//!
//! Ensures the model file is present in durable storage, copying it from the
//! read-only bundled asset on first use, then initializes the engine with the
//! artifact's final path. Runs exactly once per process lifetime; a failure
//! permanently blocks generation until restart.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ModelConfig, StorageLayout};
use crate::engine::GenerationEngine;
use crate::error::ProvisionError;

/// Provisions the model artifact and initializes the engine with it.
pub struct ModelProvisioner {
    config: ModelConfig,
    layout: StorageLayout,
    engine: Arc<dyn GenerationEngine>,
}

impl ModelProvisioner {
    pub fn new(config: ModelConfig, engine: Arc<dyn GenerationEngine>) -> anyhow::Result<Self> {
        let layout = StorageLayout::new(config.data_dir.as_deref())?;
        Ok(Self {
            config,
            layout,
            engine,
        })
    }

    /// Ensure the artifact exists in durable storage and load it into the
    /// engine. Idempotent with respect to the copy: re-running with the
    /// artifact already present writes zero bytes.
    pub async fn prepare(&self) -> Result<PathBuf, ProvisionError> {
        let target = self.layout.model_path(&self.config.name);

        if target.is_file() {
            debug!(path = %target.display(), "model artifact already provisioned, skipping copy");
        } else {
            self.copy_bundled_asset(&target).await?;
        }

        info!(path = %target.display(), "initializing engine");
        self.engine
            .load_model(&target)
            .await
            .map_err(|e| ProvisionError::EngineInitFailed(format!("{e:#}")))?;

        Ok(target)
    }

    /// Copy the bundled asset byte-for-byte into durable storage. The copy
    /// lands in a `.partial` sibling and is renamed into place, so a crash
    /// mid-copy never leaves a truncated final artifact.
    async fn copy_bundled_asset(&self, target: &Path) -> Result<(), ProvisionError> {
        let asset = self.config.asset_dir.join(&self.config.name);
        if !asset.is_file() {
            return Err(ProvisionError::AssetMissing { path: asset });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ProvisionError::CopyFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let staging = target.with_extension("partial");
        let bytes = tokio::fs::copy(&asset, &staging)
            .await
            .map_err(|source| ProvisionError::CopyFailed {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, target)
            .await
            .map_err(|source| ProvisionError::CopyFailed {
                path: target.to_path_buf(),
                source,
            })?;

        info!(bytes, path = %target.display(), "model asset copied into durable storage");
        Ok(())
    }
}
