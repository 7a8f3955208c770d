// src/main.rs

//! Entry point for a standalone process hosting the synchronous-replication
//! commit gate as a library component alongside whatever transport and
//! command-processing layers are wired in around it.
//!
//! This binary does not itself speak a wire protocol or replicate data; it
//! loads configuration, starts the commit gate, reconciles standby
//! priorities, and logs its state for the supervising process until
//! terminated. Integrations embed `spineldb_commitgate::core::state::ServerState`
//! directly rather than going through this binary.

use anyhow::Result;
use spineldb_commitgate::config::Config;
use spineldb_commitgate::core::state::ServerState;
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

#[tokio::main]
async fn main() -> Result<()> {
    run_app().await
}

async fn run_app() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("commitgate version {VERSION}");
        return Ok(());
    }

    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("config.toml");

    let config = match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e}");
            std::process::exit(1);
        }
    };

    let initial_log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(initial_log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .init();
    let reload_handle = Arc::new(reload_handle);

    info!(host = %config.host, port = config.port, "starting commit gate");

    let state = match ServerState::initialize(config, Some(reload_handle)) {
        Ok(state) => state,
        Err(e) => {
            error!("failed to initialize server state: {e}");
            std::process::exit(1);
        }
    };

    info!(
        synchronous_standbys_defined = state.commit_gate.sync_standbys_defined(),
        "commit gate ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    Ok(())
}
