//! Time budget and timeout fallback for team analysis
//!
//! A team run is bounded by an outer budget. When the budget expires, or the
//! run fails with a timeout-kind error (client timeout, upstream 504/408),
//! the caller gets a degraded but well-formed outcome flagged
//! `requires_retry` instead of an error. Any other error propagates.

use super::orchestrator::TeamOrchestrator;
use super::store::EntryStore;
use super::{
    ErrorInfo, ErrorKind, OrchestrationError, PhaseOneResult, SubjectSummary,
    TeamAnalysisOutcome,
};
use crate::journal::{AnalysisOptions, AnalysisRequest};
use crate::llm::CompletionContent;
use std::sync::Arc;
use std::time::Duration;

/// Speaker shown on the synthetic fallback result
const FALLBACK_SPEAKER: &str = "Research Team";

/// Options for `retry_analysis`
#[derive(Debug, Clone, Copy)]
pub struct RetryOptions {
    pub quick_mode: bool,
    pub enable_extended_assessment: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            quick_mode: true,
            enable_extended_assessment: false,
        }
    }
}

/// Wraps `TeamOrchestrator` with a time budget and the fallback outcome
pub struct TimeoutFallbackPolicy {
    orchestrator: Arc<TeamOrchestrator>,
    budget: Duration,
}

impl TimeoutFallbackPolicy {
    pub fn new(orchestrator: Arc<TeamOrchestrator>, budget: Duration) -> Self {
        Self {
            orchestrator,
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn orchestrator(&self) -> &TeamOrchestrator {
        &self.orchestrator
    }

    /// Run a team analysis within the configured budget
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<TeamAnalysisOutcome, OrchestrationError> {
        self.analyze_with_budget(request, self.budget).await
    }

    /// Run a team analysis within `budget`.
    ///
    /// Expiry drops the in-flight orchestration, which cancels its
    /// outstanding requests.
    pub async fn analyze_with_budget(
        &self,
        request: &AnalysisRequest,
        budget: Duration,
    ) -> Result<TeamAnalysisOutcome, OrchestrationError> {
        let subject_id = request.subject().id.as_str();

        match tokio::time::timeout(budget, self.orchestrator.run(request)).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) if e.is_timeout() => {
                tracing::warn!(
                    subject_id,
                    error = %e,
                    "Team analysis failed with a timeout, returning fallback outcome"
                );
                Ok(fallback_outcome(request, budget))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(
                    subject_id,
                    budget_secs = budget.as_secs(),
                    "Team analysis exceeded its budget, returning fallback outcome"
                );
                Ok(fallback_outcome(request, budget))
            }
        }
    }

    /// Re-run the analysis of `subject_id` from scratch.
    ///
    /// The subject and up to `history_limit` prior entries are resolved from
    /// `store`; the previous outcome is not consulted.
    pub async fn retry_analysis(
        &self,
        store: &dyn EntryStore,
        subject_id: &str,
        options: RetryOptions,
    ) -> Result<TeamAnalysisOutcome, OrchestrationError> {
        let subject = store
            .get(subject_id)
            .await?
            .ok_or_else(|| OrchestrationError::SubjectNotFound(subject_id.to_string()))?;
        let history = store
            .history_before(&subject, self.orchestrator.history_limit())
            .await?;

        tracing::info!(
            subject_id,
            history = history.len(),
            quick_mode = options.quick_mode,
            "Retrying team analysis"
        );

        let request = AnalysisRequest::new(
            subject,
            history,
            AnalysisOptions {
                quick_mode: options.quick_mode,
                enable_extended_assessment: options.enable_extended_assessment,
            },
        );
        self.analyze(&request).await
    }
}

/// The degraded outcome returned in place of a timed-out analysis
pub fn fallback_outcome(request: &AnalysisRequest, budget: Duration) -> TeamAnalysisOutcome {
    let message = format!(
        "The research team could not finish analyzing this entry within {} seconds. \
         A retry in quick mode is available.",
        budget.as_secs()
    );

    TeamAnalysisOutcome {
        subject: SubjectSummary::from(request.subject()),
        phase_one: vec![PhaseOneResult {
            role_id: None,
            speaker_name: FALLBACK_SPEAKER.to_string(),
            content: Some(CompletionContent::Text(message.clone())),
            succeeded: false,
            error_info: Some(ErrorInfo {
                kind: ErrorKind::Timeout,
                message,
                status_code: None,
            }),
        }],
        phase_two: Vec::new(),
        is_fallback: true,
        requires_retry: true,
        quick_mode: request.options().quick_mode,
        word_count: 0,
        generated_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalEntry;
    use chrono::Utc;

    #[test]
    fn test_fallback_outcome_shape() {
        let subject = JournalEntry {
            id: "e1".to_string(),
            created_at: Utc::now(),
            title: Some("Holiday call".to_string()),
            moment: None,
            initial_thoughts: None,
            tags: Vec::new(),
            analysis: None,
        };
        let request = AnalysisRequest::new(subject, Vec::new(), AnalysisOptions::default());
        let outcome = fallback_outcome(&request, Duration::from_secs(45));

        assert!(outcome.is_fallback);
        assert!(outcome.requires_retry);
        assert_eq!(outcome.phase_one.len(), 1);
        assert!(outcome.phase_two.is_empty());

        let only = &outcome.phase_one[0];
        assert!(only.role_id.is_none());
        assert!(!only.succeeded);
        assert!(only.error_info.as_ref().unwrap().is_timeout());
        assert!(only.content.as_ref().unwrap().to_text().contains("45 seconds"));

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["isFallback"], true);
        assert!(value["phaseOne"][0]["roleId"].is_null());
        assert_eq!(value["subject"]["title"], "Holiday call");
    }

    #[test]
    fn test_retry_defaults_to_quick_mode() {
        assert!(RetryOptions::default().quick_mode);
    }
}
