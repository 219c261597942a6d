//! Engine abstraction layer for text-generation backends.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

pub mod simulated;

pub use simulated::SimulatedEngine;

/// Event emitted by a generation stream.
///
/// A stream consists of zero or more `Delta` events followed by exactly one
/// terminal event (`Complete` or `Error`), in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// Incremental fragment of generated text.
    Delta(String),
    /// Generation finished normally.
    Complete,
    /// Generation aborted with an engine-reported message.
    Error(String),
}

/// Abstract engine trait for different inference backends.
///
/// The engine is used strictly sequentially: one `load_model` per process,
/// then at most one active generation stream at a time. Serialization is
/// enforced by the coordinator, not by the engine.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Load a model from the given path. Called exactly once; the loaded
    /// model lives for the rest of the process.
    async fn load_model(&self, path: &Path) -> Result<()>;

    /// Start generating a reply to `prompt`, streaming events through the
    /// returned channel in emission order.
    async fn generate_stream(&self, prompt: &str) -> Result<mpsc::Receiver<GenerationEvent>>;
}
