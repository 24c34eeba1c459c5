//! Integration tests for the two-phase research team orchestration

mod common;

use common::{entry, is_phase_one, mock, speaks_as, MockClient};
use hearth_engine::config::{FanOut, TeamConfig};
use hearth_engine::journal::{AnalysisOptions, AnalysisRequest};
use hearth_engine::llm::{CompletionContent, LLMError};
use hearth_engine::team::{ErrorKind, OrchestrationError, RoleId, Roster, TeamOrchestrator};
use serde_json::json;
use std::sync::Arc;

fn orchestrator(client: Arc<MockClient>, fan_out: FanOut) -> TeamOrchestrator {
    let config = TeamConfig {
        fan_out,
        ..TeamConfig::default()
    };
    TeamOrchestrator::new(client, Arc::new(Roster::default()), &config)
}

fn request() -> AnalysisRequest {
    AnalysisRequest::new(
        entry("today", 40),
        vec![entry("last-week", 33), entry("last-month", 10)],
        AnalysisOptions::default(),
    )
}

#[tokio::test]
async fn test_full_team_produces_five_plus_five() {
    let client = mock(MockClient::succeeding());
    let team = orchestrator(Arc::clone(&client), FanOut::Concurrent);

    let outcome = team.run(&request()).await.unwrap();

    assert_eq!(client.calls(), 10);
    assert_eq!(outcome.phase_one.len(), 5);
    assert_eq!(outcome.phase_two.len(), 5);
    assert!(!outcome.is_fallback);
    assert!(!outcome.requires_retry);
    assert!(outcome.word_count > 0);
    assert_eq!(outcome.subject.id, "today");

    let roster = Roster::default();
    let phase_one_ids: Vec<RoleId> = outcome.phase_one.iter().filter_map(|r| r.role_id).collect();
    assert_eq!(phase_one_ids, roster.ids());

    for (result, profile) in outcome.phase_two.iter().zip(roster.iter()) {
        assert_eq!(result.role_id, profile.id);
        assert_eq!(result.references_role_ids, profile.responds_to);
        assert!(result.succeeded);
    }
}

#[tokio::test]
async fn test_phase_two_sees_phase_one_summaries() {
    let client = mock(MockClient::succeeding());
    let team = orchestrator(Arc::clone(&client), FanOut::Concurrent);

    team.run(&request()).await.unwrap();

    let commentary: Vec<_> = client
        .prompts()
        .into_iter()
        .filter(|p| !is_phase_one(p))
        .collect();
    assert_eq!(commentary.len(), 5);
    for prompt in &commentary {
        assert!(prompt.user.contains("Dr. Elena Volkov notices a familiar silence"));
        assert!(prompt.user.contains("Key pattern: appeasing to avoid conflict"));
    }
}

#[tokio::test]
async fn test_history_is_rendered_into_phase_one() {
    let client = mock(MockClient::succeeding());
    let team = orchestrator(Arc::clone(&client), FanOut::Sequential);

    team.run(&request()).await.unwrap();

    let first = client.prompts().into_iter().find(is_phase_one).unwrap();
    assert!(first.user.contains("RELEVANT PATTERNS FROM PREVIOUS ENTRIES"));
    assert!(first.user.contains("Title: Dinner last-week"));
}

#[tokio::test]
async fn test_single_role_failure_is_isolated() {
    let client = mock(MockClient::new(|prompt, _| {
        if is_phase_one(prompt) && speaks_as(prompt, "Dr. Amara Okonkwo") {
            Err(LLMError::Upstream {
                status: 500,
                body: "overloaded".to_string(),
            })
        } else {
            Ok(CompletionContent::Json(common::analysis_for(prompt)))
        }
    }));
    let team = orchestrator(Arc::clone(&client), FanOut::Concurrent);

    let outcome = team.run(&request()).await.unwrap();

    assert_eq!(outcome.phase_one.len(), 5);
    assert_eq!(outcome.succeeded_roles(), 4);

    let somatic = &outcome.phase_one[2];
    assert_eq!(somatic.role_id, Some(RoleId::SomaticSpecialist));
    assert!(!somatic.succeeded);
    let info = somatic.error_info.as_ref().unwrap();
    assert_eq!(info.kind, ErrorKind::Upstream);
    assert_eq!(info.status_code, Some(500));

    // Phase two still runs for everyone, without the failed summary
    assert_eq!(outcome.phase_two.len(), 5);
    assert!(outcome.phase_two.iter().all(|r| r.succeeded));
    for prompt in client.prompts().iter().filter(|p| !is_phase_one(p)) {
        assert!(!prompt.user.contains("Dr. Amara Okonkwo notices"));
    }
}

#[tokio::test]
async fn test_phase_two_failure_is_isolated() {
    let client = mock(MockClient::new(|prompt, _| {
        if !is_phase_one(prompt) && speaks_as(prompt, "Dr. James Park") {
            Err(LLMError::NetworkError("connection reset".to_string()))
        } else {
            Ok(CompletionContent::Json(common::analysis_for(prompt)))
        }
    }));
    let team = orchestrator(Arc::clone(&client), FanOut::Concurrent);

    let outcome = team.run(&request()).await.unwrap();

    assert_eq!(outcome.succeeded_roles(), 5);
    let cbt = &outcome.phase_two[3];
    assert_eq!(cbt.role_id, RoleId::CbtAnalyst);
    assert!(!cbt.succeeded);
    assert_eq!(cbt.error_info.as_ref().unwrap().kind, ErrorKind::Network);
    assert_eq!(
        cbt.references_role_ids,
        vec![RoleId::FamilySystemsTherapist, RoleId::PsychiatricConsultant]
    );
}

#[tokio::test]
async fn test_all_phase_one_failures_end_the_run() {
    let client = mock(MockClient::failing(LLMError::NetworkError(
        "dns failure".to_string(),
    )));
    let team = orchestrator(Arc::clone(&client), FanOut::Concurrent);

    let err = team.run(&request()).await.unwrap_err();

    assert_eq!(client.calls(), 5);
    match &err {
        OrchestrationError::PhaseOneFailed { failures, first } => {
            assert_eq!(failures.len(), 5);
            assert_eq!(failures[0].0, RoleId::PsychodynamicAnalyst);
            assert_eq!(first.kind, ErrorKind::Network);
        }
        other => panic!("Expected PhaseOneFailed, got {:?}", other),
    }
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn test_missing_field_aborts_before_any_call() {
    let client = mock(MockClient::succeeding());
    let team = orchestrator(Arc::clone(&client), FanOut::Concurrent);

    let mut subject = entry("broken", 1);
    subject.moment = None;
    let err = team
        .run(&AnalysisRequest::new(subject, Vec::new(), AnalysisOptions::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::Prompt(_)));
    assert!(err.to_string().contains("entry.moment.raw_text"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_sequential_matches_concurrent_shape() {
    let client = mock(MockClient::succeeding());
    let team = orchestrator(Arc::clone(&client), FanOut::Sequential);

    let outcome = team.run(&request()).await.unwrap();

    assert_eq!(outcome.phase_one.len(), 5);
    assert_eq!(outcome.phase_two.len(), 5);

    // Sequential order is roster order, phase one before phase two
    let prompts = client.prompts();
    assert!(prompts[..5].iter().all(is_phase_one));
    assert!(speaks_as(&prompts[0], "Dr. Sarah Chen"));
    assert!(speaks_as(&prompts[4], "Dr. Elena Volkov"));
    assert!(!prompts[5..].iter().any(is_phase_one));
}

#[tokio::test]
async fn test_quick_mode_budgets() {
    let client = mock(MockClient::succeeding());
    let team = orchestrator(Arc::clone(&client), FanOut::Concurrent);

    let request = AnalysisRequest::new(
        entry("today", 2),
        Vec::new(),
        AnalysisOptions {
            quick_mode: true,
            enable_extended_assessment: false,
        },
    );
    let outcome = team.run(&request).await.unwrap();
    assert!(outcome.quick_mode);

    let prompts = client.prompts();
    let configs = client.configs();
    for (prompt, config) in prompts.iter().zip(configs.iter()) {
        assert!(config.expect_json);
        if is_phase_one(prompt) {
            assert_eq!(config.max_output_tokens, 2000);
        } else {
            assert_eq!(config.max_output_tokens, 1200);
        }
    }
}

#[tokio::test]
async fn test_single_perspective() {
    let client = mock(MockClient::succeeding());
    let team = orchestrator(Arc::clone(&client), FanOut::Concurrent);

    let content = team
        .single_perspective(RoleId::CbtAnalyst, &entry("today", 2), Some("Themes: work"), false)
        .await
        .unwrap();

    assert_eq!(client.calls(), 1);
    assert_eq!(
        content.as_json().unwrap()["speaker_name"],
        json!("Dr. James Park")
    );
    assert!(client.prompts()[0].user.contains("Themes: work"));
}

#[tokio::test]
async fn test_single_perspective_propagates_errors() {
    let client = mock(MockClient::failing(LLMError::RateLimitExceeded(
        "slow down".to_string(),
    )));
    let team = orchestrator(client, FanOut::Concurrent);

    let err = team
        .single_perspective(RoleId::SomaticSpecialist, &entry("today", 2), None, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OrchestrationError::Completion(LLMError::RateLimitExceeded(_))
    ));
}

#[tokio::test]
async fn test_checkpoint_synthesis() {
    let client = mock(MockClient::new(|_, config| {
        assert_eq!(config.max_output_tokens, 8000);
        Ok(CompletionContent::Json(json!({"checkpoint_type": "team_synthesis"})))
    }));
    let team = orchestrator(Arc::clone(&client), FanOut::Concurrent);

    let entries = vec![entry("c", 20), entry("b", 10), entry("a", 0)];
    let previous = vec![json!({
        "professional": "cbt_analyst",
        "analysis": { "pattern_identification": { "primary_pattern": "mind reading" } }
    })];
    let content = team.checkpoint_synthesis(&entries, &previous).await.unwrap();

    assert_eq!(content.as_json().unwrap()["checkpoint_type"], "team_synthesis");
    let prompt = &client.prompts()[0];
    assert!(prompt.user.contains("ENTRIES ANALYZED: 3 family incidents"));
    assert!(prompt.user.contains("- cbt_analyst: mind reading"));
}
