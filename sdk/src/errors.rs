//! Error types and handling
//!
//! This module provides the top-level error type shared by the Hearth engine
//! and its HTTP surface. All errors implement the `HearthErrorExt` trait which
//! provides user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry the upstream credential. Upstream response bodies
//! are scrubbed by the engine before they are wrapped here.

use thiserror::Error;

/// Trait for Hearth error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait HearthErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain:
    /// - Secrets (API keys, tokens, passwords)
    /// - Raw upstream response bodies
    /// - Internal implementation details
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by the caller. Non-recoverable
    /// errors require a configuration change or a corrected request.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration, missing credential
/// - **Request**: Unknown action, malformed data, prompt fields missing
/// - **Upstream**: Completion API failures, rejected credentials
/// - **Orchestration**: Timeouts and lookups during team analysis
///
/// # Examples
///
/// ```
/// use hearth_sdk::errors::{EngineError, HearthErrorExt};
///
/// let error = EngineError::InvalidAction("summon".to_string());
/// assert!(!error.is_recoverable());
///
/// let timeout = EngineError::Timeout("45s budget exceeded".to_string());
/// assert!(timeout.is_recoverable());
/// println!("Hint: {}", timeout.user_hint());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream API credential not configured (set {0})")]
    MissingCredential(String),

    // Request errors
    #[error("Unknown action: {0}")]
    InvalidAction(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    // Upstream errors
    #[error("Completion API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Completion API rejected the credential: {0}")]
    Unauthorized(String),

    #[error("Completion API rate limit exceeded")]
    RateLimited,

    #[error("LLM call timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),

    // Orchestration errors
    #[error("Analysis failed: {0}")]
    Analysis(String),
}

impl HearthErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingCredential(_) => "Export the completion API key before starting hearth",

            // Request errors
            Self::InvalidAction(_) => "Use one of the documented actions for this endpoint",
            Self::Validation(_) => "The request body does not match the expected shape",
            Self::MissingField(_) => "The entry is missing a field required for this analysis",
            Self::NotFound(_) => "The referenced entry is not part of the supplied history",

            // Upstream errors
            Self::Upstream { .. } => "The completion API returned an error. Try again later",
            Self::Unauthorized(_) => "The completion API rejected the configured key",
            Self::RateLimited => "Rate limit exceeded. Please wait before trying again",
            Self::Timeout(_) => "The analysis took too long. Retry in quick mode",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::InvalidResponse(_) => "The completion API returned an unexpected response",

            // Orchestration errors
            Self::Analysis(_) => "No analysis could be produced for this entry",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_)
            | Self::MissingCredential(_)
            | Self::InvalidAction(_)
            | Self::Validation(_)
            | Self::MissingField(_)
            | Self::Unauthorized(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
