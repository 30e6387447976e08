//! Two-peer duel demo.
//!
//! Runs an authority and a guest in one process, connected by an in-memory
//! link, and plays a scripted duel between them. The guest's transport can
//! drop a frame to show intent timeout and snapshot recovery.
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=sync=debug cargo run -p duel-peer
//! DEMO_DROP_GUEST_FRAME=none DEMO_TURNS=10 cargo run -p duel-peer
//! ```

mod config;
mod demo;
mod logging;

use std::time::Duration;

use anyhow::Result;
use duel_sync::SyncConfig;

use config::DemoConfig;
use demo::Demo;

/// Intent timeout used unless `SYNC_INTENT_TIMEOUT_MS` says otherwise.
const DEMO_INTENT_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let demo_config = DemoConfig::from_env();
    logging::setup_logging(demo_config.log_to_file)?;

    let mut sync_config = SyncConfig::from_env();
    if std::env::var_os("SYNC_INTENT_TIMEOUT_MS").is_none() {
        sync_config.intent_timeout = DEMO_INTENT_TIMEOUT;
    }

    tracing::info!(
        seed = demo_config.seed,
        turns = demo_config.turns,
        intent_timeout_ms = sync_config.intent_timeout.as_millis() as u64,
        "Starting duel demo"
    );

    let demo = Demo::start(&demo_config, sync_config)?;
    let outcome = demo.run(demo_config.turns).await;
    demo.shutdown().await?;
    outcome?;

    tracing::info!("Demo complete");
    Ok(())
}
