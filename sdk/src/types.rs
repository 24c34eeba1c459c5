//! Request and response envelopes for the inbound HTTP API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inbound request body: `{ action, data, settings }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    pub action: String,

    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default)]
    pub settings: serde_json::Value,
}

impl ApiRequest {
    /// Create a request with empty settings
    pub fn new(action: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            action: action.into(),
            data,
            settings: serde_json::Value::Null,
        }
    }

    /// Attach settings
    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }

    /// Parse the action name
    pub fn parsed_action(&self) -> Result<ApiAction, UnknownAction> {
        self.action.parse()
    }
}

/// Actions understood by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiAction {
    AnalyzeEntry,
    AutonomousDialogue,
    GenerateCheckpoint,
    DiagnosticAssessment,
    SinglePerspective,
    RetryAnalysis,
}

impl ApiAction {
    pub const ALL: [ApiAction; 6] = [
        ApiAction::AnalyzeEntry,
        ApiAction::AutonomousDialogue,
        ApiAction::GenerateCheckpoint,
        ApiAction::DiagnosticAssessment,
        ApiAction::SinglePerspective,
        ApiAction::RetryAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiAction::AnalyzeEntry => "analyze_entry",
            ApiAction::AutonomousDialogue => "autonomous_dialogue",
            ApiAction::GenerateCheckpoint => "generate_checkpoint",
            ApiAction::DiagnosticAssessment => "diagnostic_assessment",
            ApiAction::SinglePerspective => "single_perspective",
            ApiAction::RetryAnalysis => "retry_analysis",
        }
    }
}

impl fmt::Display for ApiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an action name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for ApiAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApiAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub action: String,
    pub data: T,
    pub timestamp: String,
    pub request_id: String,
}

impl<T> ApiSuccess<T> {
    pub fn new(
        action: impl Into<String>,
        data: T,
        timestamp: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            action: action.into(),
            data,
            timestamp: timestamp.into(),
            request_id: request_id.into(),
        }
    }
}

/// Failure envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFailure {
    pub error: String,
    pub message: String,
    pub timestamp: String,
    pub request_id: String,
}
