// Hearth journaling analysis service
// Main entry point for the hearth binary

use clap::Parser;
use hearth_engine::cli::{Cli, Command};
use hearth_engine::config::Config;
use hearth_engine::handlers::{
    handle_analyze, handle_checkpoint, handle_config_show, handle_serve, OutputFormat,
};
use hearth_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over config; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!(
        "Hearth v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Serve { port } => handle_serve(config, port).await,
        Command::Analyze {
            entry,
            history,
            quick,
        } => handle_analyze(&config, &entry, history.as_deref(), quick).await,
        Command::Checkpoint { entries, since } => {
            handle_checkpoint(&config, &entries, since.as_deref(), format)
        }
        Command::Config => handle_config_show(&config, format),
    }
}
