//! Single-call journal actions
//!
//! Each action is one prompt and one completion call. There is no fan-out
//! and no fallback here; errors propagate to the caller.

use crate::llm::{CompletionClient, CompletionConfig, CompletionContent, LLMError};
use crate::prompt::{PromptAssembler, PromptError, TemplateId};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Errors from the journal actions
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Completion(#[from] LLMError),
}

/// Runs entry analysis, autonomous dialogue, checkpoint reports and
/// diagnostic assessments against the completion client.
pub struct JournalAnalyst {
    client: Arc<dyn CompletionClient>,
    assembler: PromptAssembler,
}

impl JournalAnalyst {
    pub fn new(client: Arc<dyn CompletionClient>, assembler: PromptAssembler) -> Self {
        Self { client, assembler }
    }

    /// Cognitive-distortion analysis of `data.entry`, with optional
    /// `data.previousEntries` for pattern recognition.
    ///
    /// `extended` adds the diagnostic-indicator block.
    pub async fn analyze_entry(
        &self,
        data: &Value,
        extended: bool,
    ) -> Result<CompletionContent, JournalError> {
        let mut payload = data.clone();
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(
                "options".to_string(),
                serde_json::json!({ "enableExtendedAssessment": extended }),
            );
        }
        let entry_id = data
            .pointer("/entry/id")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let previous_entries = data
            .get("previousEntries")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        debug!(entry_id, previous_entries, extended, "Analyzing entry");
        self.run(
            TemplateId::EntryAnalysis,
            &payload,
            CompletionConfig::json(0.7, 4000),
        )
        .await
    }

    /// Conversation between two perspectives about `data.entries`
    pub async fn autonomous_dialogue(&self, data: &Value) -> Result<CompletionContent, JournalError> {
        self.run(
            TemplateId::AutonomousDialogue,
            data,
            CompletionConfig::json(0.8, 3000),
        )
        .await
    }

    /// Pattern report over `data.entries`
    pub async fn generate_checkpoint(&self, data: &Value) -> Result<CompletionContent, JournalError> {
        self.run(
            TemplateId::CheckpointReport,
            data,
            CompletionConfig::json(0.7, 5000),
        )
        .await
    }

    /// Diagnostic-style assessment over `data.entries`
    pub async fn diagnostic_assessment(
        &self,
        data: &Value,
    ) -> Result<CompletionContent, JournalError> {
        self.run(
            TemplateId::DiagnosticAssessment,
            data,
            CompletionConfig::json(0.5, 6000),
        )
        .await
    }

    async fn run(
        &self,
        template: TemplateId,
        payload: &Value,
        config: CompletionConfig,
    ) -> Result<CompletionContent, JournalError> {
        let prompt = self.assembler.build(template, payload)?;
        debug!(
            template = %template,
            prompt_chars = prompt.user.len(),
            "Prompt assembled"
        );

        let started = Instant::now();
        let result = self.client.complete(&prompt, &config).await?;

        info!(
            template = %template,
            elapsed_ms = started.elapsed().as_millis() as u64,
            parse_error = result.content.is_parse_error(),
            "Journal action complete"
        );
        Ok(result.content)
    }
}
