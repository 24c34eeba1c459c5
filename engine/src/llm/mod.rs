//! Completion Client Abstraction Layer
//!
//! This module provides the common interface for one bounded call to a
//! chat-completion API. The `CompletionClient` trait is what the journal
//! analyst and the research team orchestrator depend on; `openai` holds the
//! HTTP implementation used in production.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod openai;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during a completion call
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Authentication failed ({status}): {body}")]
    AuthenticationFailed { status: u16, body: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LLMError {
    /// Client-side timeouts and gateway/request timeouts reported by the
    /// upstream (504, 408) are the same failure for recovery purposes.
    pub fn is_timeout(&self) -> bool {
        match self {
            LLMError::Timeout => true,
            LLMError::Upstream { status, .. } => *status == 504 || *status == 408,
            _ => false,
        }
    }

    /// HTTP status reported by the upstream, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LLMError::Upstream { status, .. } | LLMError::AuthenticationFailed { status, .. } => {
                Some(*status)
            }
            LLMError::RateLimitExceeded(_) => Some(429),
            _ => None,
        }
    }
}

/// Message in a chat-completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// An assembled prompt: one system message and one user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// The prompt as chat messages
    pub fn messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }

    /// Rough token estimate (~4 characters per token)
    pub fn estimated_tokens(&self) -> usize {
        (self.system.len() + self.user.len()) / 4
    }
}

/// Per-call generation settings
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    /// Model override; the client's default model when `None`
    pub model: Option<String>,

    /// Sampling temperature, 0.0..=2.0
    pub temperature: f32,

    /// Upper bound on generated tokens, must be positive
    pub max_output_tokens: u32,

    /// Ask for a JSON object and parse the content
    pub expect_json: bool,
}

impl CompletionConfig {
    /// JSON-mode settings with the given budget
    pub fn json(temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            model: None,
            temperature,
            max_output_tokens,
            expect_json: true,
        }
    }

    /// Plain-text settings with the given budget
    pub fn text(temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            model: None,
            temperature,
            max_output_tokens,
            expect_json: false,
        }
    }

    /// Checks the ranges accepted by the completion API
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LLMError::InvalidRequest(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(LLMError::InvalidRequest(
                "max_output_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Content returned by a completion call
///
/// Serializes untagged: a JSON object, a string, or
/// `{"raw_content": ..., "parse_error": true}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CompletionContent {
    /// Parsed JSON object (JSON mode)
    Json(serde_json::Value),

    /// Plain text (text mode)
    Text(String),

    /// JSON mode was requested but the content did not parse
    Unparsed {
        raw_content: String,
        parse_error: bool,
    },
}

impl CompletionContent {
    pub fn unparsed(raw_content: impl Into<String>) -> Self {
        CompletionContent::Unparsed {
            raw_content: raw_content.into(),
            parse_error: true,
        }
    }

    /// True when JSON was expected but could not be parsed.
    /// Callers must check this before treating the content as structured.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            CompletionContent::Unparsed {
                parse_error: true,
                ..
            }
        )
    }

    /// Structured content, if any
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            CompletionContent::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The content as text (JSON is rendered compactly)
    pub fn to_text(&self) -> String {
        match self {
            CompletionContent::Json(value) => value.to_string(),
            CompletionContent::Text(text) => text.clone(),
            CompletionContent::Unparsed { raw_content, .. } => raw_content.clone(),
        }
    }

    /// Whitespace-separated word count of the textual content
    pub fn word_count(&self) -> usize {
        match self {
            CompletionContent::Json(value) => json_word_count(value),
            CompletionContent::Text(text) => text.split_whitespace().count(),
            CompletionContent::Unparsed { raw_content, .. } => {
                raw_content.split_whitespace().count()
            }
        }
    }

    pub fn into_value(self) -> serde_json::Value {
        match self {
            CompletionContent::Json(value) => value,
            CompletionContent::Text(text) => serde_json::Value::String(text),
            unparsed @ CompletionContent::Unparsed { .. } => {
                serde_json::to_value(unparsed).unwrap_or(serde_json::Value::Null)
            }
        }
    }
}

fn json_word_count(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::String(s) => s.split_whitespace().count(),
        serde_json::Value::Array(items) => items.iter().map(json_word_count).sum(),
        serde_json::Value::Object(map) => map.values().map(json_word_count).sum(),
        _ => 0,
    }
}

/// Token accounting reported by the upstream
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Result of a completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub content: CompletionContent,
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

impl CompletionResult {
    pub fn new(content: CompletionContent) -> Self {
        Self {
            content,
            model: None,
            usage: None,
            finish_reason: None,
        }
    }
}

/// Completion client trait that all backends must implement
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the name of the backend (e.g., "openai")
    fn name(&self) -> &str;

    /// Model used when a call does not override it
    fn default_model(&self) -> &str;

    /// Perform one completion call
    ///
    /// # Returns
    /// * `Ok(CompletionResult)` - Text, parsed JSON, or flagged raw content
    /// * `Err(LLMError)` - If the request fails; no retry is attempted
    async fn complete(&self, prompt: &Prompt, config: &CompletionConfig)
        -> Result<CompletionResult>;

    /// Check if the backend is currently reachable
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Parse model output that is supposed to be a JSON object.
///
/// Handles the output shapes models actually produce in JSON mode:
/// 1. Raw JSON (the whole content)
/// 2. Fenced JSON (with or without trailing text): ` ```json\n{...}\n``` `
/// 3. A JSON object embedded in prose
///
/// Anything else is returned as `CompletionContent::Unparsed`.
pub fn parse_json_content(content: &str) -> CompletionContent {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return CompletionContent::Json(value);
    }

    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(inner.trim()) {
            return CompletionContent::Json(value);
        }
    }

    if let Some(pos) = trimmed.find('{') {
        if let Some(json_str) = extract_balanced_json(&trimmed[pos..]) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str) {
                return CompletionContent::Json(value);
            }
        }
    }

    CompletionContent::unparsed(content)
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
