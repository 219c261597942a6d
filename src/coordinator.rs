//! Generation coordinator.
//!
//! Owns the conversation transcript and the ready/busy state, serializes
//! prompt submissions, and drains the engine's event stream into the
//! transcript. Observers subscribe to full transcript snapshots and to the
//! busy flag; `submit` is the sole mutating entry point exposed to them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ChatConfig;
use crate::engine::{GenerationEngine, GenerationEvent};
use crate::error::ProvisionError;
use crate::provision::ModelProvisioner;
use crate::transcript::{Message, Transcript};

/// Greeting seeded into the transcript at startup.
pub const GREETING: &str = "I'm running locally on your device!";

const NOT_READY_NOTICE: &str = "Model not loaded yet.";

/// Ephemeral per-prompt state: lives from acceptance to the terminal event.
struct GenerationSession {
    prompt: String,
    accumulated: String,
    /// Index of the in-progress assistant message in the transcript.
    slot: usize,
}

/// Coordinates model provisioning and streaming generation sessions.
///
/// One instance lives for the whole application session and is shared by
/// reference with every consumer.
pub struct ChatCoordinator {
    engine: Arc<dyn GenerationEngine>,
    transcript: Mutex<Transcript>,
    transcript_tx: watch::Sender<Vec<Message>>,
    /// Claimed by the first provision call; the model is loaded once and
    /// never reloaded.
    provisioning: AtomicBool,
    /// False until provisioning succeeds; written once.
    ready: AtomicBool,
    /// True for the duration of exactly one generation session.
    busy: AtomicBool,
    busy_tx: watch::Sender<bool>,
}

impl ChatCoordinator {
    pub fn new(engine: Arc<dyn GenerationEngine>) -> Arc<Self> {
        let mut transcript = Transcript::new();
        transcript.push(Message::assistant(GREETING));
        let (transcript_tx, _) = watch::channel(transcript.snapshot());
        let (busy_tx, _) = watch::channel(false);

        Arc::new(Self {
            engine,
            transcript: Mutex::new(transcript),
            transcript_tx,
            provisioning: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            busy_tx,
        })
    }

    /// Spawn the one-time provisioning task in the background. The caller is
    /// never blocked; readiness is published through the ready flag.
    pub fn start(self: &Arc<Self>, config: ChatConfig) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.provision(config).await;
        });
    }

    /// Run provisioning to completion. Publishes readiness on success; on
    /// failure appends a terminal system notice distinguishing the copy stage
    /// from engine initialization, and readiness stays false for the rest of
    /// the process.
    pub async fn provision(&self, config: ChatConfig) {
        if self
            .provisioning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("provisioning already ran, ignoring repeat call");
            return;
        }

        let model_name = config.model.name.clone();
        let provisioner = match ModelProvisioner::new(config.model, Arc::clone(&self.engine)) {
            Ok(provisioner) => provisioner,
            Err(e) => {
                error!(error = %e, "failed to resolve durable storage");
                self.append_notice(format!("Error preparing local storage: {e}"));
                return;
            }
        };

        match provisioner.prepare().await {
            Ok(path) => {
                self.ready.store(true, Ordering::Release);
                info!(path = %path.display(), "model loaded, accepting prompts");
            }
            Err(err) => {
                error!(error = %err, "provisioning failed");
                let notice = match &err {
                    ProvisionError::AssetMissing { .. } | ProvisionError::CopyFailed { .. } => {
                        format!(
                            "Error copying model file. Please ensure '{model_name}' is bundled with the app. ({err})"
                        )
                    }
                    ProvisionError::EngineInitFailed(_) => {
                        format!("Failed to load model. ({err})")
                    }
                };
                self.append_notice(notice);
            }
        }
    }

    /// Submit a prompt. Non-blocking: a not-ready rejection appends a system
    /// notice and returns; an accepted prompt appends the user message plus
    /// an empty in-progress assistant message, then streams in the
    /// background.
    ///
    /// A prompt arriving while a session is active is dropped (logged, not
    /// queued): the busy observable exists so the presentation layer can gate
    /// its input, and a notice here would displace the in-progress message
    /// from the last transcript slot.
    pub fn submit(self: &Arc<Self>, prompt: impl Into<String>) {
        let prompt = prompt.into();

        if !self.ready.load(Ordering::Acquire) {
            warn!("prompt rejected: model not ready");
            self.append_notice(NOT_READY_NOTICE);
            return;
        }

        // Acceptance gate: a single compare-and-set closes the window between
        // checking the busy flag and claiming it, so two concurrent submits
        // can never both start a session.
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("prompt dropped: generation in progress");
            return;
        }
        self.busy_tx.send_replace(true);

        let slot = {
            let mut transcript = self.transcript.lock();
            transcript.push(Message::user(prompt.clone()));
            let slot = transcript.push(Message::assistant(""));
            self.transcript_tx.send_replace(transcript.snapshot());
            slot
        };

        let session = GenerationSession {
            prompt,
            accumulated: String::new(),
            slot,
        };
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_session(session).await;
        });
    }

    /// Drain one generation stream into the transcript, applying the terminal
    /// rules: exactly one of complete/error ends the session and clears busy.
    async fn run_session(&self, mut session: GenerationSession) {
        info!(prompt_chars = session.prompt.len(), "generation session started");

        let mut events = match self.engine.generate_stream(&session.prompt).await {
            Ok(events) => events,
            Err(e) => {
                self.fail_session(&format!("{e:#}"));
                return;
            }
        };

        while let Some(event) = events.recv().await {
            match event {
                GenerationEvent::Delta(text) => {
                    session.accumulated.push_str(&text);
                    let mut transcript = self.transcript.lock();
                    transcript.set_content(session.slot, session.accumulated.clone());
                    self.transcript_tx.send_replace(transcript.snapshot());
                }
                GenerationEvent::Complete => {
                    info!(reply_chars = session.accumulated.len(), "generation complete");
                    self.clear_busy();
                    return;
                }
                GenerationEvent::Error(message) => {
                    self.fail_session(&message);
                    return;
                }
            }
        }

        // The protocol promises exactly one terminal event; a stream that
        // closes without one is treated as an engine error. Partial text
        // stays in the transcript either way.
        self.fail_session("generation stream ended unexpectedly");
    }

    /// Terminal error path: the partial assistant text is left as-is, a
    /// system notice is appended, and the coordinator stays usable.
    fn fail_session(&self, message: &str) {
        error!(%message, "generation failed");
        {
            let mut transcript = self.transcript.lock();
            transcript.push(Message::system(format!("Generation error: {message}")));
            self.transcript_tx.send_replace(transcript.snapshot());
        }
        self.clear_busy();
    }

    fn clear_busy(&self) {
        self.busy.store(false, Ordering::Release);
        self.busy_tx.send_replace(false);
    }

    fn append_notice(&self, text: impl Into<String>) {
        let mut transcript = self.transcript.lock();
        transcript.push(Message::system(text));
        self.transcript_tx.send_replace(transcript.snapshot());
    }

    /// Subscribe to full transcript snapshots, re-published on every mutation.
    pub fn subscribe_transcript(&self) -> watch::Receiver<Vec<Message>> {
        self.transcript_tx.subscribe()
    }

    /// Subscribe to busy-state changes.
    pub fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.busy_tx.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Current transcript contents.
    pub fn transcript_snapshot(&self) -> Vec<Message> {
        self.transcript.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::path::Path;
    use tokio::sync::mpsc;

    struct UnusedEngine;

    #[async_trait]
    impl GenerationEngine for UnusedEngine {
        async fn load_model(&self, _path: &Path) -> anyhow::Result<()> {
            Ok(())
        }

        async fn generate_stream(
            &self,
            _prompt: &str,
        ) -> anyhow::Result<mpsc::Receiver<GenerationEvent>> {
            Err(anyhow!("not expected in this test"))
        }
    }

    #[tokio::test]
    async fn test_submit_before_ready_appends_single_notice() {
        let coordinator = ChatCoordinator::new(Arc::new(UnusedEngine));
        assert!(!coordinator.is_ready());

        coordinator.submit("hi");

        let transcript = coordinator.transcript_snapshot();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].content, GREETING);
        assert_eq!(transcript[1].role, Role::System);
        assert_eq!(transcript[1].content, NOT_READY_NOTICE);
        assert!(!coordinator.is_busy());
    }

    #[tokio::test]
    async fn test_transcript_seeds_with_greeting() {
        let coordinator = ChatCoordinator::new(Arc::new(UnusedEngine));
        let transcript = coordinator.transcript_snapshot();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, Role::Assistant);
        assert_eq!(transcript[0].content, GREETING);
    }
}
