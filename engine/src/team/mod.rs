//! Research team analysis
//!
//! Five professional perspectives analyze an entry independently (phase one),
//! then each responds to its colleagues (phase two). `TeamOrchestrator` runs
//! the phases, `TimeoutFallbackPolicy` bounds the whole run and substitutes
//! a degraded outcome when it times out.

use crate::journal::JournalEntry;
use crate::llm::{CompletionContent, LLMError};
use crate::prompt::PromptError;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod fallback;
pub mod orchestrator;
pub mod roster;
pub mod store;

pub use fallback::{RetryOptions, TimeoutFallbackPolicy};
pub use orchestrator::TeamOrchestrator;
pub use roster::{RoleId, RoleProfile, Roster};
pub use store::{EntryStore, MemoryEntryStore, StoreError};

/// Classification of a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Upstream,
    Timeout,
    Network,
    Authentication,
    RateLimited,
    InvalidResponse,
    InvalidRequest,
}

/// Serializable record of why a role's call failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ErrorInfo {
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }
}

impl From<&LLMError> for ErrorInfo {
    fn from(err: &LLMError) -> Self {
        let kind = match err {
            e if e.is_timeout() => ErrorKind::Timeout,
            LLMError::Upstream { .. } => ErrorKind::Upstream,
            LLMError::AuthenticationFailed { .. } => ErrorKind::Authentication,
            LLMError::RateLimitExceeded(_) => ErrorKind::RateLimited,
            LLMError::NetworkError(_) => ErrorKind::Network,
            LLMError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            LLMError::ParseError(_) => ErrorKind::InvalidResponse,
            LLMError::Timeout => ErrorKind::Timeout,
        };
        Self {
            kind,
            message: err.to_string(),
            status_code: err.status_code(),
        }
    }
}

/// One role's independent analysis
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseOneResult {
    /// `None` only for the synthetic entry of a fallback outcome
    pub role_id: Option<RoleId>,
    pub speaker_name: String,
    pub content: Option<CompletionContent>,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ErrorInfo>,
}

/// One role's response to its colleagues
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTwoResult {
    pub role_id: RoleId,
    pub speaker_name: String,
    pub references_role_ids: Vec<RoleId>,
    pub content: Option<CompletionContent>,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ErrorInfo>,
}

/// The analyzed entry, as reported back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct SubjectSummary {
    pub id: String,
    pub title: Option<String>,
    pub date: DateTime<Utc>,
}

impl From<&JournalEntry> for SubjectSummary {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            date: entry.created_at,
        }
    }
}

/// Everything one team analysis produced
///
/// Built once per run and never patched; a retry produces a new one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAnalysisOutcome {
    pub subject: SubjectSummary,
    pub phase_one: Vec<PhaseOneResult>,
    pub phase_two: Vec<PhaseTwoResult>,
    pub is_fallback: bool,
    pub requires_retry: bool,
    pub quick_mode: bool,
    pub word_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl TeamAnalysisOutcome {
    pub fn succeeded_roles(&self) -> usize {
        self.phase_one.iter().filter(|r| r.succeeded).count()
    }
}

/// Errors from team orchestration
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Prompt assembly failed: {0}")]
    Prompt(#[from] PromptError),

    #[error("All {} phase-one analyses failed; first: {}", .failures.len(), .first.message)]
    PhaseOneFailed {
        failures: Vec<(RoleId, ErrorInfo)>,
        first: ErrorInfo,
    },

    #[error("Subject entry not found: {0}")]
    SubjectNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Completion(#[from] LLMError),
}

impl OrchestrationError {
    /// The phase-one failure that decides how a failed run is reported
    ///
    /// A rejected credential wins over everything, then any timeout-kind
    /// failure, then the first failure in roster order. Roster order alone
    /// never turns a timed-out run into a hard error.
    pub fn decisive_failure(&self) -> Option<&ErrorInfo> {
        let OrchestrationError::PhaseOneFailed { failures, first } = self else {
            return None;
        };
        let find = |kind: ErrorKind| {
            failures
                .iter()
                .map(|(_, info)| info)
                .find(|info| info.kind == kind)
        };
        Some(
            find(ErrorKind::Authentication)
                .or_else(|| find(ErrorKind::Timeout))
                .unwrap_or(first),
        )
    }

    /// Timeout-kind errors are the ones the fallback policy absorbs.
    pub fn is_timeout(&self) -> bool {
        match self {
            OrchestrationError::PhaseOneFailed { .. } => {
                self.decisive_failure().is_some_and(ErrorInfo::is_timeout)
            }
            OrchestrationError::Completion(e) => e.is_timeout(),
            _ => false,
        }
    }
}
