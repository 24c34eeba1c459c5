//! Prompt assembly
//!
//! Turns a template id plus a JSON payload into a `Prompt`. Assembly is pure:
//! no clock, no I/O. Required fields are located by JSON pointer and a field
//! that is absent or `null` is reported by name, so a caller learns exactly
//! what its entry is missing.

use crate::journal::JournalEntry;
use crate::llm::Prompt;
use crate::team::roster::{RoleId, Roster};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

mod templates;

/// Errors raised while assembling a prompt
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PromptError {
    #[error("{template} prompt requires field `{field}`")]
    MissingField { template: TemplateId, field: String },

    #[error("{template} prompt field `{field}` must be {expected}")]
    InvalidField {
        template: TemplateId,
        field: String,
        expected: &'static str,
    },

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),
}

/// Which prompt to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateId {
    /// Cognitive-distortion analysis of one entry
    EntryAnalysis,
    /// Two-perspective conversation offered after a quiet stretch
    AutonomousDialogue,
    /// Pattern report across a window of entries
    CheckpointReport,
    /// Probabilistic diagnostic-style assessment across all entries
    DiagnosticAssessment,
    /// Team phase one: one role's independent analysis
    InitialAnalysis(RoleId),
    /// Team phase two: one role's response to its colleagues
    CrossCommentary(RoleId),
    /// Whole-team synthesis across a window of entries
    TeamCheckpoint,
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateId::EntryAnalysis => write!(f, "entry_analysis"),
            TemplateId::AutonomousDialogue => write!(f, "autonomous_dialogue"),
            TemplateId::CheckpointReport => write!(f, "checkpoint_report"),
            TemplateId::DiagnosticAssessment => write!(f, "diagnostic_assessment"),
            TemplateId::InitialAnalysis(role) => write!(f, "initial_analysis({})", role),
            TemplateId::CrossCommentary(role) => write!(f, "cross_commentary({})", role),
            TemplateId::TeamCheckpoint => write!(f, "team_checkpoint"),
        }
    }
}

/// Builds prompts from templates and payloads
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    roster: Arc<Roster>,
}

impl PromptAssembler {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Build the prompt for `template` from `payload`.
    ///
    /// # Errors
    /// * `PromptError::MissingField` - a required field is absent or null
    /// * `PromptError::InvalidField` - a field has the wrong shape
    /// * `PromptError::UnknownRole` - the role is not on the roster
    pub fn build(&self, template: TemplateId, payload: &Value) -> Result<Prompt, PromptError> {
        let fields = Fields::new(template, payload);
        match template {
            TemplateId::EntryAnalysis => templates::entry_analysis(&fields),
            TemplateId::AutonomousDialogue => templates::autonomous_dialogue(&fields),
            TemplateId::CheckpointReport => templates::checkpoint_report(&fields),
            TemplateId::DiagnosticAssessment => templates::diagnostic_assessment(&fields),
            TemplateId::InitialAnalysis(role) => {
                templates::initial_analysis(&fields, self.roster.profile(role)?, &self.roster)
            }
            TemplateId::CrossCommentary(role) => {
                templates::cross_commentary(&fields, self.roster.profile(role)?, &self.roster)
            }
            TemplateId::TeamCheckpoint => templates::team_checkpoint(&fields),
        }
    }
}

/// Render the most recent `limit` entries of `history` as prompt context.
///
/// Returns `None` when there is no history to show.
pub fn format_historical_context(history: &[JournalEntry], limit: usize) -> Option<String> {
    if history.is_empty() || limit == 0 {
        return None;
    }

    let blocks: Vec<String> = history
        .iter()
        .take(limit)
        .map(|entry| {
            let themes = if entry.tags.is_empty() {
                "None".to_string()
            } else {
                entry.tags.join(", ")
            };
            format!(
                "Date: {}\nTitle: {}\nKey Pattern: {}\nThemes: {}",
                entry.created_at.to_rfc3339(),
                entry.title.as_deref().unwrap_or("Untitled"),
                entry.primary_pattern().unwrap_or("Not analyzed"),
                themes
            )
        })
        .collect();

    Some(blocks.join("\n---\n"))
}

/// Pointer-based access to a payload, reporting failures against a template
struct Fields<'a> {
    template: TemplateId,
    payload: &'a Value,
    prefix: String,
}

impl<'a> Fields<'a> {
    fn new(template: TemplateId, payload: &'a Value) -> Self {
        Self {
            template,
            payload,
            prefix: String::new(),
        }
    }

    /// Fields of an element nested under this payload, e.g. `entries[2]`
    fn nested(&self, value: &'a Value, name: String) -> Fields<'a> {
        let prefix = if self.prefix.is_empty() {
            name
        } else {
            format!("{}.{}", self.prefix, name)
        };
        Fields {
            template: self.template,
            payload: value,
            prefix,
        }
    }

    fn field_name(&self, pointer: &str) -> String {
        let path = pointer.trim_start_matches('/').replace('/', ".");
        if self.prefix.is_empty() {
            path
        } else {
            format!("{}.{}", self.prefix, path)
        }
    }

    fn optional(&self, pointer: &str) -> Option<&'a Value> {
        self.payload.pointer(pointer).filter(|v| !v.is_null())
    }

    fn require(&self, pointer: &str) -> Result<&'a Value, PromptError> {
        self.optional(pointer)
            .ok_or_else(|| PromptError::MissingField {
                template: self.template,
                field: self.field_name(pointer),
            })
    }

    /// Required field rendered verbatim
    fn text(&self, pointer: &str) -> Result<String, PromptError> {
        self.require(pointer).map(render)
    }

    /// Optional field rendered verbatim, `None` when absent or blank
    fn optional_text(&self, pointer: &str) -> Option<String> {
        self.optional(pointer)
            .map(render)
            .filter(|s| !s.trim().is_empty())
    }

    /// Optional field rendered verbatim, `default` when absent
    fn text_or(&self, pointer: &str, default: &str) -> String {
        self.optional_text(pointer)
            .unwrap_or_else(|| default.to_string())
    }

    fn flag(&self, pointer: &str) -> bool {
        self.optional(pointer)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn array(&self, pointer: &str) -> Result<&'a Vec<Value>, PromptError> {
        self.require(pointer)?
            .as_array()
            .ok_or_else(|| self.invalid(pointer, "an array"))
    }

    fn non_empty_array(&self, pointer: &str) -> Result<&'a Vec<Value>, PromptError> {
        let items = self.array(pointer)?;
        if items.is_empty() {
            return Err(self.invalid(pointer, "a non-empty array"));
        }
        Ok(items)
    }

    /// Optional array; absent, null or non-array values read as empty
    fn optional_array(&self, pointer: &str) -> &'a [Value] {
        self.optional(pointer)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn invalid(&self, pointer: &str, expected: &'static str) -> PromptError {
        PromptError::InvalidField {
            template: self.template,
            field: self.field_name(pointer),
            expected,
        }
    }
}

/// Render a JSON value for embedding: strings verbatim, arrays joined by
/// ", ", anything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(render)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut
fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
