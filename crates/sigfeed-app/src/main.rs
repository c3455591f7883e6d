//! Live signal feed service - Entry Point

use anyhow::Result;
use clap::Parser;
use sigfeed_app::{AppConfig, Application};
use tracing::{info, warn};

/// Live signal feed synchronization and notification service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SIGFEED_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Default log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = AppConfig::resolve_path(args.config);
    let loaded = AppConfig::load(&config_path)?;
    let defaulted = loaded.is_none();
    let config = loaded.unwrap_or_default();

    let level = args
        .log_level
        .unwrap_or_else(|| config.telemetry.log_level.clone());
    sigfeed_telemetry::init_logging(&level)?;

    info!("Starting sigfeed v{}", env!("CARGO_PKG_VERSION"));
    if defaulted {
        warn!(config_path = %config_path, "Config file not found, using defaults");
    } else {
        info!(config_path = %config_path, "Configuration loaded");
    }

    let app = Application::new(config)?;
    app.run().await?;

    Ok(())
}
