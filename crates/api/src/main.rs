//! Heartwise - Main Entry Point
//!
//! Usage: `heartwise [CONFIG_FILE]`

use anyhow::Context;
use api::{init_logging, load_config, run_server};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref()).context("failed to load configuration")?;

    init_logging(&config.logging)?;

    info!("=== Heartwise v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Database: {}, model: {}",
        config.database.url,
        config.model.path.as_deref().unwrap_or("built-in")
    );

    run_server(config).await?;

    Ok(())
}
