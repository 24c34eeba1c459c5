//! Configuration management
//!
//! This module handles loading, validation, and management of the Hearth configuration.
//! Configuration is stored in TOML format at ~/.hearth/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Completion endpoint, model, request timeout and the credential variable
//! - **server**: Bind address for the HTTP API
//! - **team**: Research team fan-out mode, per-call timeout and overall budget
//! - **checkpoint**: Thresholds for periodic checkpoint synthesis
//!
//! The API key itself is never stored in the file. `llm.api_key_env` names the
//! environment variable it is read from at startup.
//!
//! # Examples
//!
//! ```no_run
//! use hearth_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! println!("Model: {}", config.llm.model);
//! println!("Budget: {}s", config.team.analysis_budget_secs);
//! # Ok(())
//! # }
//! ```

use hearth_sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Completion API settings
    #[serde(default)]
    pub llm: LLMConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Research team orchestration settings
    #[serde(default)]
    pub team: TeamConfig,

    /// Checkpoint scheduling thresholds
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Completion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL for the chat-completion API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the bearer credential
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Upper bound on one completion request, connect to last byte (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// How the research team fans out its calls within a phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FanOut {
    /// All roles of a phase are in flight at once
    #[default]
    Concurrent,

    /// One role at a time, in roster order
    Sequential,
}

/// Research team configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Fan-out mode for both phases
    #[serde(default)]
    pub fan_out: FanOut,

    /// Timeout for a single role call (seconds)
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Overall budget for one team analysis (seconds)
    #[serde(default = "default_analysis_budget")]
    pub analysis_budget_secs: u64,

    /// Number of prior entries resolved as history on retry
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

/// Checkpoint scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Entries in the window that trigger a checkpoint
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold: usize,

    /// Days spanned by the window that trigger a checkpoint
    #[serde(default = "default_span_days")]
    pub span_days: i64,

    /// Days without a new entry before an autonomous dialogue is offered
    #[serde(default = "default_dialogue_idle_days")]
    pub dialogue_idle_days: i64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_call_timeout() -> u64 {
    40
}

fn default_analysis_budget() -> u64 {
    45
}

fn default_history_limit() -> usize {
    5
}

fn default_entry_threshold() -> usize {
    10
}

fn default_span_days() -> i64 {
    30
}

fn default_dialogue_idle_days() -> i64 {
    3
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            fan_out: FanOut::default(),
            call_timeout_secs: default_call_timeout(),
            analysis_budget_secs: default_analysis_budget(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            entry_threshold: default_entry_threshold(),
            span_days: default_span_days(),
            dialogue_idle_days: default_dialogue_idle_days(),
        }
    }
}

impl LLMConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TeamConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn analysis_budget(&self) -> Duration {
        Duration::from_secs(self.analysis_budget_secs)
    }
}

impl ServerConfig {
    /// Parse the configured host and port into a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, EngineError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| EngineError::Config(format!("Invalid server address: {}", e)))
    }
}

impl Config {
    /// Load configuration from the default location (~/.hearth/config.toml)
    ///
    /// If the configuration file doesn't exist, writes a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {:?}", path);
        Ok(config)
    }

    /// Get the default configuration file path (~/.hearth/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".hearth").join("config.toml"))
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The log level is unknown
    /// - A URL, model or credential variable name is empty
    /// - A timeout or threshold is zero
    /// - The per-call timeout exceeds the overall analysis budget
    pub fn validate(&self) -> Result<(), EngineError> {
        // Validate log level
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(EngineError::Config(format!(
                "llm.base_url must be an http(s) URL, got '{}'",
                self.llm.base_url
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(EngineError::Config("llm.model must not be empty".to_string()));
        }
        if self.llm.api_key_env.trim().is_empty() {
            return Err(EngineError::Config(
                "llm.api_key_env must name an environment variable".to_string(),
            ));
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "llm.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        // Validate team timeouts
        if self.team.call_timeout_secs == 0 || self.team.analysis_budget_secs == 0 {
            return Err(EngineError::Config(
                "team timeouts must be greater than zero".to_string(),
            ));
        }
        if self.team.call_timeout_secs > self.team.analysis_budget_secs {
            return Err(EngineError::Config(format!(
                "team.call_timeout_secs ({}) must not exceed team.analysis_budget_secs ({})",
                self.team.call_timeout_secs, self.team.analysis_budget_secs
            )));
        }

        // Validate checkpoint thresholds
        if self.checkpoint.entry_threshold < 2 {
            return Err(EngineError::Config(
                "checkpoint.entry_threshold must be at least 2".to_string(),
            ));
        }
        if self.checkpoint.span_days <= 0 || self.checkpoint.dialogue_idle_days <= 0 {
            return Err(EngineError::Config(
                "checkpoint day thresholds must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.team.analysis_budget_secs, 45);
        assert_eq!(config.team.fan_out, FanOut::Concurrent);
        assert_eq!(config.checkpoint.entry_threshold, 10);
        assert_eq!(config.checkpoint.span_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_valid() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.team.history_limit, 5);
    }

    #[test]
    fn test_invalid_log_level() {
        let err = Config::from_toml_str("[core]\nlog_level = \"loud\"\n").unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_request_timeout() {
        let config = Config::from_toml_str("[llm]\nrequest_timeout_secs = 15\n").unwrap();
        assert_eq!(config.llm.request_timeout(), Duration::from_secs(15));
        assert_eq!(Config::default().llm.request_timeout_secs, 60);

        let err = Config::from_toml_str("[llm]\nrequest_timeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("llm.request_timeout_secs"));
    }

    #[test]
    fn test_call_timeout_above_budget_rejected() {
        let err = Config::from_toml_str(
            "[team]\ncall_timeout_secs = 60\nanalysis_budget_secs = 45\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn test_fan_out_parsing() {
        let config = Config::from_toml_str("[team]\nfan_out = \"sequential\"\n").unwrap();
        assert_eq!(config.team.fan_out, FanOut::Sequential);
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        let addr = config.server.socket_addr().unwrap();
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.model, deserialized.llm.model);
        assert_eq!(config.team.fan_out, deserialized.team.fan_out);
    }
}
