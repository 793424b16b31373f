//! Arena client binary.
//!
//! Drives one battle at a time from stdin against the combat backend
//! configured through `COMBAT_API_URL` and `COMBAT_API_TOKEN`.
//!
//! ```bash
//! COMBAT_API_URL=http://localhost:8080 cargo run -p arena-client
//! ```

use anyhow::Result;
use arena_client::command::HELP;
use arena_client::driver::render_session;
use arena_client::logging::setup_logging;
use arena_client::{ArenaCommand, ArenaConfig, BattleDriver, Flow, spawn_event_log};
use client_backend_http::HttpCombatClient;
use combat_runtime::{CombatRuntime, ResumeOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. Load configuration from environment
    let config = ArenaConfig::from_env();

    // 2. Setup logging; the guard flushes the file writer on exit
    let _log_guard = setup_logging(config.log_dir.as_deref())?;
    tracing::info!("Starting arena client");

    // 3. Build the backend client and the runtime
    let client = HttpCombatClient::from_env()?;
    tracing::info!("Combat backend: {}", client.config().base_url);

    let runtime = CombatRuntime::builder()
        .config(config.runtime.clone())
        .client(client)
        .build()
        .await?;
    let event_log = spawn_event_log(&runtime.handle());

    // 4. Pick up a battle left open by an earlier run
    match runtime.resumption().check().await {
        Ok(ResumeOutcome::Resumed(session)) => {
            println!("Resuming your battle.\n{}", render_session(&session));
        }
        Ok(ResumeOutcome::NoActiveSession) => println!("{HELP}"),
        Err(e) => {
            tracing::warn!("Resumption check failed: {}", e);
            println!("Could not check for an open battle ({e}).\n{HELP}");
        }
    }

    // 5. Prompt loop
    let driver = BattleDriver::new(runtime.handle(), config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<ArenaCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("! {e}");
                continue;
            }
        };
        match driver.execute(command).await? {
            Flow::Continue(text) => println!("{text}"),
            Flow::Quit => break,
        }
    }

    drop(driver);
    runtime.shutdown().await?;
    if let Err(e) = event_log.await {
        tracing::warn!("Event log task failed: {}", e);
    }

    tracing::info!("Arena client shutdown complete");
    Ok(())
}
