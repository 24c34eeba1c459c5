//! Two-phase research team orchestration
//!
//! Phase one: every role analyzes the entry independently.
//! Phase two: every role responds to the phase-one results, naming the
//! colleagues it `responds_to`.
//!
//! Each call is time-boxed on its own and captured as a `Result`, so one
//! role's failure never takes down the others. Phase two starts only after
//! every phase-one call has finished. Results keep roster order.

use super::roster::{RoleId, RoleProfile, Roster};
use super::{
    ErrorInfo, OrchestrationError, PhaseOneResult, PhaseTwoResult, SubjectSummary,
    TeamAnalysisOutcome,
};
use crate::config::{FanOut, TeamConfig};
use crate::journal::{AnalysisRequest, JournalEntry};
use crate::llm::{CompletionClient, CompletionConfig, CompletionContent, LLMError, Prompt};
use crate::prompt::{PromptAssembler, TemplateId};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

const PHASE_ONE_TOKENS: u32 = 5000;
const PHASE_ONE_QUICK_TOKENS: u32 = 2000;
const PHASE_TWO_TOKENS: u32 = 3000;
const PHASE_TWO_QUICK_TOKENS: u32 = 1200;
const CHECKPOINT_TOKENS: u32 = 8000;
const TEAM_TEMPERATURE: f32 = 0.8;

/// Runs the research team over one entry
pub struct TeamOrchestrator {
    client: Arc<dyn CompletionClient>,
    assembler: PromptAssembler,
    fan_out: FanOut,
    call_timeout: Duration,
    history_limit: usize,
}

impl TeamOrchestrator {
    pub fn new(client: Arc<dyn CompletionClient>, roster: Arc<Roster>, config: &TeamConfig) -> Self {
        Self {
            client,
            assembler: PromptAssembler::new(roster),
            fan_out: config.fan_out,
            call_timeout: config.call_timeout(),
            history_limit: config.history_limit,
        }
    }

    pub fn roster(&self) -> &Roster {
        self.assembler.roster()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Run both phases for `request`.
    ///
    /// # Errors
    /// * `OrchestrationError::Prompt` - a phase-one prompt could not be
    ///   assembled; no call was made
    /// * `OrchestrationError::PhaseOneFailed` - every phase-one call failed
    pub async fn run(
        &self,
        request: &AnalysisRequest,
    ) -> Result<TeamAnalysisOutcome, OrchestrationError> {
        let started = Instant::now();
        let subject = request.subject();
        let options = request.options();
        let roster = self.roster();

        tracing::info!(
            subject_id = %subject.id,
            roles = roster.len(),
            quick_mode = options.quick_mode,
            fan_out = ?self.fan_out,
            "Starting team analysis"
        );

        // Phase one prompts are all assembled before any call goes out
        let payload = json!({
            "entry": subject,
            "historicalContext": request.effective_historical_context(self.history_limit),
            "options": options,
        });
        let mut phase_one_calls = Vec::with_capacity(roster.len());
        for profile in roster.iter() {
            let prompt = self
                .assembler
                .build(TemplateId::InitialAnalysis(profile.id), &payload)?;
            phase_one_calls.push((profile.id, prompt));
        }

        let phase_one_config = CompletionConfig::json(
            TEAM_TEMPERATURE,
            if options.quick_mode {
                PHASE_ONE_QUICK_TOKENS
            } else {
                PHASE_ONE_TOKENS
            },
        );
        let phase_one_results = self
            .fan_out(&phase_one_calls, &phase_one_config, "initial_analysis")
            .await;

        let phase_one: Vec<PhaseOneResult> = roster
            .iter()
            .zip(phase_one_results)
            .map(|(profile, result)| phase_one_result(profile, result))
            .collect();

        let failures: Vec<(RoleId, ErrorInfo)> = phase_one
            .iter()
            .filter_map(|r| match (r.role_id, &r.error_info) {
                (Some(role), Some(info)) => Some((role, info.clone())),
                _ => None,
            })
            .collect();

        if failures.len() == phase_one.len() {
            let first = failures[0].1.clone();
            tracing::error!(
                subject_id = %subject.id,
                first_error = %first.message,
                "Every phase-one analysis failed"
            );
            return Err(OrchestrationError::PhaseOneFailed { failures, first });
        }

        tracing::info!(
            succeeded = phase_one.len() - failures.len(),
            failed = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Phase one complete"
        );

        // Phase two sees every successful phase-one summary
        let analyses: Vec<Value> = phase_one
            .iter()
            .filter(|r| r.succeeded)
            .filter_map(|r| {
                let role = r.role_id?;
                let content = r.content.as_ref()?;
                Some(json!({
                    "roleId": role,
                    "speakerName": r.speaker_name,
                    "summary": summarize(content),
                }))
            })
            .collect();
        let commentary_payload = json!({
            "entry": subject,
            "analyses": analyses,
        });

        let mut phase_two_calls = Vec::with_capacity(roster.len());
        for profile in roster.iter() {
            let prompt = self
                .assembler
                .build(TemplateId::CrossCommentary(profile.id), &commentary_payload)?;
            phase_two_calls.push((profile.id, prompt));
        }

        let phase_two_config = CompletionConfig::json(
            TEAM_TEMPERATURE,
            if options.quick_mode {
                PHASE_TWO_QUICK_TOKENS
            } else {
                PHASE_TWO_TOKENS
            },
        );
        let phase_two_results = self
            .fan_out(&phase_two_calls, &phase_two_config, "cross_commentary")
            .await;

        let phase_two: Vec<PhaseTwoResult> = roster
            .iter()
            .zip(phase_two_results)
            .map(|(profile, result)| phase_two_result(profile, result))
            .collect();

        let word_count = phase_one
            .iter()
            .filter(|r| r.succeeded)
            .filter_map(|r| r.content.as_ref())
            .chain(
                phase_two
                    .iter()
                    .filter(|r| r.succeeded)
                    .filter_map(|r| r.content.as_ref()),
            )
            .map(CompletionContent::word_count)
            .sum();

        tracing::info!(
            subject_id = %subject.id,
            phase_two_succeeded = phase_two.iter().filter(|r| r.succeeded).count(),
            word_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Team analysis complete"
        );

        Ok(TeamAnalysisOutcome {
            subject: SubjectSummary::from(subject),
            phase_one,
            phase_two,
            is_fallback: false,
            requires_retry: false,
            quick_mode: options.quick_mode,
            word_count,
            generated_at: chrono::Utc::now(),
        })
    }

    /// One role's phase-one analysis on its own. Errors propagate.
    pub async fn single_perspective(
        &self,
        role: RoleId,
        entry: &JournalEntry,
        historical_context: Option<&str>,
        quick_mode: bool,
    ) -> Result<CompletionContent, OrchestrationError> {
        let payload = json!({
            "entry": entry,
            "historicalContext": historical_context,
            "options": { "quickMode": quick_mode },
        });
        let prompt = self
            .assembler
            .build(TemplateId::InitialAnalysis(role), &payload)?;
        let config = CompletionConfig::json(
            TEAM_TEMPERATURE,
            if quick_mode {
                PHASE_ONE_QUICK_TOKENS
            } else {
                PHASE_ONE_TOKENS
            },
        );

        tracing::info!(role = %role, subject_id = %entry.id, "Requesting single perspective");
        let content = self.call(role, &prompt, &config).await?;
        Ok(content)
    }

    /// Whole-team synthesis across `entries` (most recent first)
    pub async fn checkpoint_synthesis(
        &self,
        entries: &[JournalEntry],
        previous_analyses: &[Value],
    ) -> Result<CompletionContent, OrchestrationError> {
        let payload = json!({
            "entries": entries,
            "previousAnalyses": previous_analyses,
        });
        let prompt = self.assembler.build(TemplateId::TeamCheckpoint, &payload)?;
        let config = CompletionConfig::json(TEAM_TEMPERATURE, CHECKPOINT_TOKENS);

        tracing::info!(
            entries = entries.len(),
            previous_analyses = previous_analyses.len(),
            "Requesting team checkpoint synthesis"
        );
        let result = self.client.complete(&prompt, &config).await?;
        Ok(result.content)
    }

    /// Execute one call per role, returning results in input order
    async fn fan_out(
        &self,
        calls: &[(RoleId, Prompt)],
        config: &CompletionConfig,
        phase: &'static str,
    ) -> Vec<Result<CompletionContent, LLMError>> {
        match self.fan_out {
            FanOut::Concurrent => {
                let futures = calls.iter().map(|(role, prompt)| {
                    self.call(*role, prompt, config)
                        .instrument(tracing::info_span!("role_call", role = %role, phase))
                });
                futures::future::join_all(futures).await
            }
            FanOut::Sequential => {
                let mut results = Vec::with_capacity(calls.len());
                for (role, prompt) in calls {
                    let result = self
                        .call(*role, prompt, config)
                        .instrument(tracing::info_span!("role_call", role = %role, phase))
                        .await;
                    results.push(result);
                }
                results
            }
        }
    }

    /// One time-boxed completion call
    async fn call(
        &self,
        role: RoleId,
        prompt: &Prompt,
        config: &CompletionConfig,
    ) -> Result<CompletionContent, LLMError> {
        let started = Instant::now();
        match tokio::time::timeout(self.call_timeout, self.client.complete(prompt, config)).await {
            Ok(Ok(result)) => {
                tracing::debug!(
                    role = %role,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    parse_error = result.content.is_parse_error(),
                    "Role call succeeded"
                );
                Ok(result.content)
            }
            Ok(Err(e)) => {
                tracing::warn!(role = %role, error = %e, "Role call failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    role = %role,
                    timeout_secs = self.call_timeout.as_secs(),
                    "Role call timed out"
                );
                Err(LLMError::Timeout)
            }
        }
    }
}

fn phase_one_result(
    profile: &RoleProfile,
    result: Result<CompletionContent, LLMError>,
) -> PhaseOneResult {
    match result {
        Ok(content) => PhaseOneResult {
            role_id: Some(profile.id),
            speaker_name: profile.display_name.clone(),
            content: Some(content),
            succeeded: true,
            error_info: None,
        },
        Err(e) => PhaseOneResult {
            role_id: Some(profile.id),
            speaker_name: profile.display_name.clone(),
            content: None,
            succeeded: false,
            error_info: Some(ErrorInfo::from(&e)),
        },
    }
}

fn phase_two_result(
    profile: &RoleProfile,
    result: Result<CompletionContent, LLMError>,
) -> PhaseTwoResult {
    let (content, error_info) = match result {
        Ok(content) => (Some(content), None),
        Err(e) => (None, Some(ErrorInfo::from(&e))),
    };
    PhaseTwoResult {
        role_id: profile.id,
        speaker_name: profile.display_name.clone(),
        references_role_ids: profile.responds_to.clone(),
        succeeded: content.is_some(),
        content,
        error_info,
    }
}

/// Condense a phase-one analysis for the commentary prompt
fn summarize(content: &CompletionContent) -> String {
    let Some(value) = content.as_json() else {
        return content.to_text();
    };

    let sections = [
        ("Main observation", "/analysis/opening_observation"),
        ("Key pattern", "/analysis/pattern_identification/primary_pattern"),
        ("Theoretical take", "/analysis/theoretical_framework/through_my_lens"),
    ];
    let lines: Vec<String> = sections
        .iter()
        .filter_map(|(label, pointer)| {
            value
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(|text| format!("- {}: {}", label, text))
        })
        .collect();

    if lines.is_empty() {
        value.to_string()
    } else {
        lines.join("\n")
    }
}
