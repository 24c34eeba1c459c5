//! Integration tests for the team analysis time budget and retry

mod common;

use common::{analysis_for, entry, mock, speaks_as, MockClient};
use hearth_engine::config::TeamConfig;
use hearth_engine::journal::{AnalysisOptions, AnalysisRequest};
use hearth_engine::llm::{CompletionContent, LLMError};
use hearth_engine::team::{
    ErrorKind, MemoryEntryStore, OrchestrationError, RetryOptions, Roster, TeamOrchestrator,
    TimeoutFallbackPolicy,
};
use std::sync::Arc;
use std::time::Duration;

fn policy(client: Arc<MockClient>, budget_secs: u64) -> TimeoutFallbackPolicy {
    let config = TeamConfig::default();
    let orchestrator = TeamOrchestrator::new(client, Arc::new(Roster::default()), &config);
    TimeoutFallbackPolicy::new(Arc::new(orchestrator), Duration::from_secs(budget_secs))
}

fn request() -> AnalysisRequest {
    AnalysisRequest::new(entry("today", 5), Vec::new(), AnalysisOptions::default())
}

fn store() -> MemoryEntryStore {
    MemoryEntryStore::new(vec![
        entry("first", 0),
        entry("second", 3),
        entry("third", 6),
        entry("fourth", 9),
    ])
}

#[tokio::test]
async fn test_gateway_timeouts_become_fallback() {
    let client = mock(MockClient::failing(LLMError::Upstream {
        status: 504,
        body: "Gateway Timeout".to_string(),
    }));
    let policy = policy(Arc::clone(&client), 45);

    let outcome = policy.analyze(&request()).await.unwrap();

    assert!(outcome.is_fallback);
    assert!(outcome.requires_retry);
    assert_eq!(outcome.subject.id, "today");
    assert_eq!(outcome.phase_one.len(), 1);
    assert!(outcome.phase_two.is_empty());
    assert_eq!(client.calls(), 5);

    let info = outcome.phase_one[0].error_info.as_ref().unwrap();
    assert_eq!(info.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn test_mixed_failures_with_timeouts_become_fallback() {
    // The first role in the roster sees a 502, everyone else a 504
    let client = mock(MockClient::new(|prompt, _| {
        let status = if speaks_as(prompt, "Dr. Sarah Chen") {
            502
        } else {
            504
        };
        Err(LLMError::Upstream {
            status,
            body: "gateway".to_string(),
        })
    }));
    let policy = policy(Arc::clone(&client), 45);

    let outcome = policy.analyze(&request()).await.unwrap();

    assert!(outcome.is_fallback);
    assert!(outcome.requires_retry);
    assert_eq!(client.calls(), 5);
    let info = outcome.phase_one[0].error_info.as_ref().unwrap();
    assert_eq!(info.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn test_authentication_failure_outranks_timeouts() {
    let client = mock(MockClient::new(|prompt, _| {
        if speaks_as(prompt, "Dr. James Park") {
            Err(LLMError::AuthenticationFailed {
                status: 401,
                body: "Incorrect API key".to_string(),
            })
        } else {
            Err(LLMError::Timeout)
        }
    }));
    let policy = policy(client, 45);

    let err = policy.analyze(&request()).await.unwrap_err();

    assert!(!err.is_timeout());
    let decisive = err.decisive_failure().unwrap();
    assert_eq!(decisive.kind, ErrorKind::Authentication);
    assert_eq!(decisive.status_code, Some(401));
}

#[tokio::test]
async fn test_partial_failure_is_not_fallback() {
    // One timed-out role does not sink a run the others completed
    let client = mock(MockClient::new(|prompt, _| {
        if speaks_as(prompt, "Dr. Elena Volkov") {
            Err(LLMError::Timeout)
        } else {
            Ok(CompletionContent::Json(analysis_for(prompt)))
        }
    }));
    let policy = policy(client, 45);

    let outcome = policy.analyze(&request()).await.unwrap();

    assert!(!outcome.is_fallback);
    assert_eq!(outcome.succeeded_roles(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_slow_team_exceeds_budget() {
    let client = mock(MockClient::succeeding().with_delay(Duration::from_secs(60)));
    let policy = policy(Arc::clone(&client), 10);

    let outcome = policy.analyze(&request()).await.unwrap();

    assert!(outcome.is_fallback);
    assert!(outcome.requires_retry);
    assert!(outcome.phase_two.is_empty());
    let message = outcome.phase_one[0].content.as_ref().unwrap().to_text();
    assert!(message.contains("10 seconds"));
}

#[tokio::test(start_paused = true)]
async fn test_per_call_timeouts_become_fallback() {
    // Every role call hits its own 40s timeout before the 45s budget expires
    let client = mock(MockClient::succeeding().with_delay(Duration::from_secs(42)));
    let policy = policy(Arc::clone(&client), 45);

    let outcome = policy.analyze(&request()).await.unwrap();

    assert!(outcome.is_fallback);
    assert_eq!(client.calls(), 5);
    assert!(outcome.phase_one[0]
        .content
        .as_ref()
        .unwrap()
        .to_text()
        .contains("45 seconds"));
}

#[tokio::test]
async fn test_explicit_budget_overrides_default() {
    let client = mock(MockClient::failing(LLMError::Timeout));
    let policy = policy(client, 45);

    let outcome = policy
        .analyze_with_budget(&request(), Duration::from_secs(20))
        .await
        .unwrap();

    assert!(outcome.is_fallback);
    assert!(outcome.phase_one[0]
        .content
        .as_ref()
        .unwrap()
        .to_text()
        .contains("20 seconds"));
}

#[tokio::test]
async fn test_non_timeout_failures_propagate() {
    let client = mock(MockClient::failing(LLMError::Upstream {
        status: 500,
        body: "Internal Server Error".to_string(),
    }));
    let policy = policy(client, 45);

    let err = policy.analyze(&request()).await.unwrap_err();

    match err {
        OrchestrationError::PhaseOneFailed { first, .. } => {
            assert_eq!(first.kind, ErrorKind::Upstream);
            assert_eq!(first.status_code, Some(500));
        }
        other => panic!("Expected PhaseOneFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_successful_run_is_not_fallback() {
    let client = mock(MockClient::succeeding());
    let policy = policy(client, 45);

    let outcome = policy.analyze(&request()).await.unwrap();

    assert!(!outcome.is_fallback);
    assert_eq!(outcome.phase_one.len(), 5);
    assert_eq!(outcome.phase_two.len(), 5);
}

#[tokio::test]
async fn test_retry_resolves_subject_and_history() {
    let client = mock(MockClient::succeeding());
    let policy = policy(Arc::clone(&client), 45);

    let outcome = policy
        .retry_analysis(&store(), "third", RetryOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.subject.id, "third");
    assert!(outcome.quick_mode);
    assert_eq!(outcome.phase_one.len(), 5);

    // History is what came before the subject, never after it
    let prompt = &client.prompts()[0];
    assert!(prompt.user.contains("Title: Dinner second"));
    assert!(prompt.user.contains("Title: Dinner first"));
    assert!(!prompt.user.contains("Title: Dinner fourth"));
}

#[tokio::test]
async fn test_retries_are_independent() {
    let client = mock(MockClient::succeeding());
    let policy = policy(Arc::clone(&client), 45);
    let store = store();

    let first = policy
        .retry_analysis(&store, "fourth", RetryOptions::default())
        .await
        .unwrap();
    let second = policy
        .retry_analysis(&store, "fourth", RetryOptions::default())
        .await
        .unwrap();

    assert_eq!(client.calls(), 20);
    assert_eq!(first.phase_one.len(), second.phase_one.len());
    assert_eq!(first.phase_two.len(), second.phase_two.len());
    assert_eq!(first.subject.id, second.subject.id);
    assert!(first.quick_mode && second.quick_mode);
}

#[tokio::test]
async fn test_retry_unknown_subject() {
    let client = mock(MockClient::succeeding());
    let policy = policy(Arc::clone(&client), 45);

    let err = policy
        .retry_analysis(&store(), "missing", RetryOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::SubjectNotFound(ref id) if id == "missing"));
    assert_eq!(client.calls(), 0);
}
