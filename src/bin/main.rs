//! Localchat binary.
//!
//! Thin presentation layer over the chat coordinator: reads prompts from
//! stdin, renders transcript updates to stdout, and holds no protocol state
//! of its own.

use std::sync::Arc;

use clap::Parser;
use localchat_core::config::{Args, ChatConfig};
use localchat_core::{ChatCoordinator, SimulatedEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .parse_lossy(args.log_filter.as_deref().unwrap_or("localchat_core=debug")),
        )
        .with_target(true)
        .init();

    let mut config = ChatConfig::load(args.config.as_deref())?;
    config.apply_args(&args);
    info!(model = %config.model.name, "localchat starting up");

    let engine = Arc::new(SimulatedEngine::new());
    let coordinator = ChatCoordinator::new(engine);
    coordinator.start(config);

    // Render settled transcript entries as they are published. The
    // in-progress assistant message is printed once its session ends.
    let renderer = Arc::clone(&coordinator);
    tokio::spawn(async move {
        let mut transcript_rx = renderer.subscribe_transcript();
        let mut busy_rx = renderer.subscribe_busy();
        let mut printed = 0usize;
        loop {
            {
                let snapshot = transcript_rx.borrow_and_update().clone();
                let busy = *busy_rx.borrow_and_update();
                let settled = if busy {
                    snapshot.len().saturating_sub(1)
                } else {
                    snapshot.len()
                };
                if settled > printed {
                    for message in &snapshot[printed..settled] {
                        println!("{message}");
                    }
                    printed = settled;
                }
            }
            tokio::select! {
                changed = transcript_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = busy_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        coordinator.submit(prompt);
    }

    Ok(())
}
