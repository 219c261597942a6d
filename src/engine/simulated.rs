//! Simulated generation engine.
//!
//! Streams a canned word-by-word reply so the coordinator can run end to end
//! without a real inference backend. Useful for the CLI demo and for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{GenerationEngine, GenerationEvent};

/// Engine that simulates token-by-token generation.
pub struct SimulatedEngine {
    loaded: RwLock<Option<PathBuf>>,
    delay: Duration,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(30))
    }

    /// Create an engine that waits `delay` between emitted deltas.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            loaded: RwLock::new(None),
            delay,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.read().is_some()
    }

    fn canned_reply(prompt: &str) -> String {
        let lower = prompt.to_lowercase();
        if lower.contains("hello") || lower.contains("hi") {
            "Hello! I'm a small language model running locally on this device.".to_string()
        } else if lower.contains("code") {
            format!("I can help with coding tasks. You asked: '{prompt}'.")
        } else {
            format!("I understand your request: '{prompt}'. This reply was generated entirely on-device.")
        }
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationEngine for SimulatedEngine {
    async fn load_model(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(anyhow!("model file not found: {}", path.display()));
        }
        *self.loaded.write() = Some(path.to_path_buf());
        info!(path = %path.display(), "simulated engine loaded model");
        Ok(())
    }

    async fn generate_stream(&self, prompt: &str) -> Result<mpsc::Receiver<GenerationEvent>> {
        if self.loaded.read().is_none() {
            return Err(anyhow!("no model loaded"));
        }

        let reply = Self::canned_reply(prompt);
        let delay = self.delay;
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            for word in reply.split_inclusive(' ') {
                if tx.send(GenerationEvent::Delta(word.to_string())).await.is_err() {
                    debug!("generation stream receiver dropped, stopping");
                    return;
                }
                tokio::time::sleep(delay).await;
            }
            let _ = tx.send(GenerationEvent::Complete).await;
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine() -> SimulatedEngine {
        SimulatedEngine::with_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_generate_requires_loaded_model() {
        let engine = test_engine();
        assert!(engine.generate_stream("hi").await.is_err());
    }

    #[tokio::test]
    async fn test_load_model_requires_existing_file() {
        let engine = test_engine();
        let missing = Path::new("/nonexistent/model.gguf");
        assert!(engine.load_model(missing).await.is_err());
        assert!(!engine.is_loaded());
    }

    #[tokio::test]
    async fn test_stream_deltas_concatenate_to_reply() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.gguf");
        std::fs::write(&model, b"weights").unwrap();

        let engine = test_engine();
        engine.load_model(&model).await.unwrap();

        let mut rx = engine.generate_stream("hello").await.unwrap();
        let mut text = String::new();
        let mut terminal = None;
        while let Some(event) = rx.recv().await {
            match event {
                GenerationEvent::Delta(t) => text.push_str(&t),
                other => {
                    terminal = Some(other);
                    break;
                }
            }
        }

        assert_eq!(terminal, Some(GenerationEvent::Complete));
        assert_eq!(text, SimulatedEngine::canned_reply("hello"));
        assert!(!text.is_empty());
    }
}
