//! stowd entry point.
//!
//! Plays the host: drives the engine through install and activation, then
//! relays command messages from stdin (one JSON object per line). Logging
//! goes to stderr so stdout stays free for the hosting application.

use anyhow::Result;
use stow_engine::{CacheEngine, LifecycleEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = stow_core::EngineConfig::load()?;
    let engine = CacheEngine::open(config).await?;

    if let Err(e) = engine.on_event(LifecycleEvent::Install).await {
        tracing::error!(error = %e, "install reported missing assets; continuing to activation");
    }
    engine.on_event(LifecycleEvent::Activate).await?;

    tracing::info!("stow engine active; reading command messages from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        engine.handle_message(line);
    }

    Ok(())
}
