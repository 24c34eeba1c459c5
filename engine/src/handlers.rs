//! Command handlers
//!
//! One function per CLI command. Handlers use `anyhow` for context-rich
//! errors at the binary edge.

use crate::api::{self, AppState};
use crate::checkpoint::CheckpointScheduler;
use crate::config::Config;
use crate::journal::{AnalysisOptions, AnalysisRequest, JournalEntry};
use crate::llm::openai::OpenAICompletionClient;
use crate::llm::CompletionClient;
use crate::secrets::load_api_key;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Build the shared completion client from config.
///
/// Fails when the API key variable is missing or blank.
pub fn build_client(config: &Config) -> Result<Arc<dyn CompletionClient>> {
    let api_key = load_api_key(&config.llm.api_key_env)?;
    let client = OpenAICompletionClient::new(
        &config.llm.base_url,
        &config.llm.model,
        api_key,
        config.llm.request_timeout(),
    )?;
    tracing::info!(
        provider = client.name(),
        model = %config.llm.model,
        base_url = %config.llm.base_url,
        request_timeout_secs = config.llm.request_timeout_secs,
        "Completion client ready"
    );
    Ok(Arc::new(client))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Serve the HTTP API until Ctrl-C
pub async fn handle_serve(mut config: Config, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    let client = build_client(&config)?;
    let state = AppState::new(client, &config);
    api::serve(&config, state).await?;
    Ok(())
}

/// Run a team analysis of one entry and print the outcome as JSON
pub async fn handle_analyze(
    config: &Config,
    entry_path: &Path,
    history_path: Option<&Path>,
    quick: bool,
) -> Result<()> {
    let entry: JournalEntry = read_json(entry_path)?;
    let history: Vec<JournalEntry> = match history_path {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let client = build_client(config)?;
    let state = AppState::new(client, config);

    let request = AnalysisRequest::new(
        entry,
        history,
        AnalysisOptions {
            quick_mode: quick,
            enable_extended_assessment: false,
        },
    );
    let outcome = state
        .team
        .analyze(&request)
        .await
        .context("Team analysis failed")?;

    if outcome.is_fallback {
        tracing::warn!("Analysis timed out; rerun with --quick to retry");
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Report whether a checkpoint is due for the entries in a file
pub fn handle_checkpoint(
    config: &Config,
    entries_path: &Path,
    since: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let entries: Vec<JournalEntry> = read_json(entries_path)?;
    let since: Option<DateTime<Utc>> = since
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("Invalid --since timestamp: {}", s))
        })
        .transpose()?;

    let scheduler = CheckpointScheduler::new(&config.checkpoint);
    let decision = scheduler.decide(&entries, since);
    let offer_dialogue = entries
        .iter()
        .map(|e| e.created_at)
        .max()
        .map(|last| scheduler.should_offer_dialogue(last, Utc::now()))
        .unwrap_or(false);

    match format {
        OutputFormat::Text => {
            println!(
                "Checkpoint due: {}",
                if decision.due { "yes" } else { "no" }
            );
            println!("  Entries in window: {}", decision.window_entries);
            println!("  Days spanned:      {}", decision.span_days);
            println!(
                "  Offer dialogue:    {}",
                if offer_dialogue { "yes" } else { "no" }
            );
        }
        OutputFormat::Json => {
            let output = json!({
                "checkpoint": decision,
                "offerDialogue": offer_dialogue,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", toml::to_string_pretty(config)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}
