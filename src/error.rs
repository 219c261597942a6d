//! Error types for model provisioning.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while provisioning the model artifact or initializing the engine.
///
/// Every variant permanently blocks generation for the process lifetime: the
/// coordinator reports it once as a system transcript entry and never retries.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("bundled model asset not found at {}", path.display())]
    AssetMissing { path: PathBuf },

    #[error("failed to copy model asset to {}: {source}", path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine failed to initialize model: {0}")]
    EngineInitFailed(String),
}
