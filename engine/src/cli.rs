//! CLI interface for Hearth
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hearth journaling analysis service
///
/// Serves the journal and research-team HTTP API, or runs a single analysis
/// from the command line.
#[derive(Parser, Debug)]
#[command(name = "hearth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a research team analysis of one entry
    Analyze {
        /// JSON file holding the entry
        entry: PathBuf,

        /// JSON file holding prior entries (array, most recent first)
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,

        /// Smaller word targets and token budgets
        #[arg(long)]
        quick: bool,
    },

    /// Check whether a checkpoint is due
    Checkpoint {
        /// JSON file holding entries (array)
        entries: PathBuf,

        /// Time of the last checkpoint (RFC 3339)
        #[arg(long, value_name = "RFC3339")]
        since: Option<String>,
    },

    /// Print the effective configuration
    Config,
}
