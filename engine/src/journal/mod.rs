//! Journal entries and analysis requests
//!
//! `JournalEntry` mirrors the shape the browser client stores and sends.
//! The optional fields stay optional here so that prompt assembly, not
//! deserialization, reports exactly which field an analysis is missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod analyst;

pub use analyst::{JournalAnalyst, JournalError};

/// A user-authored journal entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: String,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moment: Option<Moment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_thoughts: Option<InitialThoughts>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Earlier analysis attached by the client, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
}

/// The free-text description of what happened
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Moment {
    pub raw_text: String,
}

/// The user's structured first reaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InitialThoughts {
    #[serde(default)]
    pub emotions_felt: Vec<String>,

    #[serde(default)]
    pub body_sensations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_response: Option<String>,
}

impl JournalEntry {
    /// Primary pattern recorded by an earlier team analysis, if any
    pub fn primary_pattern(&self) -> Option<&str> {
        self.analysis
            .as_ref()
            .and_then(|a| a.pointer("/pattern_identification/primary_pattern"))
            .and_then(|p| p.as_str())
    }
}

/// Options that shape a team analysis
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Smaller word targets and token budgets
    #[serde(default)]
    pub quick_mode: bool,

    /// Include diagnostic-indicator sections
    #[serde(default)]
    pub enable_extended_assessment: bool,
}

/// Everything one team analysis needs
///
/// Immutable once constructed; a retry builds a new request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    subject: JournalEntry,
    history: Vec<JournalEntry>,
    historical_context: Option<String>,
    options: AnalysisOptions,
}

impl AnalysisRequest {
    /// `history` is expected most-recent first.
    pub fn new(subject: JournalEntry, history: Vec<JournalEntry>, options: AnalysisOptions) -> Self {
        Self {
            subject,
            history,
            historical_context: None,
            options,
        }
    }

    /// Use caller-provided context instead of rendering it from history
    pub fn with_historical_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.historical_context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }

    pub fn subject(&self) -> &JournalEntry {
        &self.subject
    }

    pub fn history(&self) -> &[JournalEntry] {
        &self.history
    }

    pub fn historical_context(&self) -> Option<&str> {
        self.historical_context.as_deref()
    }

    pub fn options(&self) -> AnalysisOptions {
        self.options
    }

    /// Caller-provided context, or the most recent `limit` history entries
    /// rendered for the prompt.
    pub fn effective_historical_context(&self, limit: usize) -> Option<String> {
        self.historical_context
            .clone()
            .or_else(|| crate::prompt::format_historical_context(&self.history, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_entry() -> serde_json::Value {
        json!({
            "id": "e1",
            "createdAt": "2024-03-01T09:30:00Z",
            "title": "Sunday dinner",
            "moment": { "raw_text": "Mom criticized my job again." },
            "initial_thoughts": {
                "emotions_felt": ["anger", "shame"],
                "body_sensations": ["tight chest"],
                "actual_response": "I went quiet."
            },
            "tags": ["family", "criticism"]
        })
    }

    #[test]
    fn test_entry_wire_shape() {
        let entry: JournalEntry = serde_json::from_value(wire_entry()).unwrap();
        assert_eq!(
            entry.moment.as_ref().map(|m| m.raw_text.as_str()),
            Some("Mom criticized my job again.")
        );
        assert_eq!(entry.tags.len(), 2);

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["createdAt"], "2024-03-01T09:30:00Z");
        assert_eq!(back["initial_thoughts"]["emotions_felt"][1], "shame");
    }

    #[test]
    fn test_minimal_entry() {
        let entry: JournalEntry =
            serde_json::from_value(json!({"id": "e2", "createdAt": "2024-03-02T00:00:00Z"}))
                .unwrap();
        assert!(entry.title.is_none());
        assert!(entry.moment.is_none());
        assert!(entry.tags.is_empty());
    }

    #[test]
    fn test_primary_pattern() {
        let mut entry: JournalEntry = serde_json::from_value(wire_entry()).unwrap();
        assert_eq!(entry.primary_pattern(), None);
        entry.analysis = Some(json!({"pattern_identification": {"primary_pattern": "appeasing"}}));
        assert_eq!(entry.primary_pattern(), Some("appeasing"));
    }

    #[test]
    fn test_request_context_override() {
        let entry: JournalEntry = serde_json::from_value(wire_entry()).unwrap();
        let request = AnalysisRequest::new(entry.clone(), vec![entry], AnalysisOptions::default());
        assert!(request
            .effective_historical_context(5)
            .unwrap()
            .contains("Sunday dinner"));

        let request = request.with_historical_context("custom context");
        assert_eq!(
            request.effective_historical_context(5).as_deref(),
            Some("custom context")
        );
    }

    #[test]
    fn test_options_wire_names() {
        let options: AnalysisOptions =
            serde_json::from_value(json!({"quickMode": true})).unwrap();
        assert!(options.quick_mode);
        assert!(!options.enable_extended_assessment);
    }
}
