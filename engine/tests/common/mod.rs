//! Shared helpers for engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use hearth_engine::journal::{InitialThoughts, JournalEntry, Moment};
use hearth_engine::llm::{
    CompletionClient, CompletionConfig, CompletionContent, CompletionResult, LLMError, Prompt,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(&Prompt, &CompletionConfig) -> Result<CompletionContent, LLMError> + Send + Sync;

/// Completion client driven by a closure, recording every call
pub struct MockClient {
    responder: Box<Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(Prompt, CompletionConfig)>>,
}

impl MockClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Prompt, &CompletionConfig) -> Result<CompletionContent, LLMError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds with a structured analysis naming the speaker
    pub fn succeeding() -> Self {
        Self::new(|prompt, _| Ok(CompletionContent::Json(analysis_for(prompt))))
    }

    /// Every call fails with a clone of `err`
    pub fn failing(err: LLMError) -> Self {
        Self::new(move |_, _| Err(err.clone()))
    }

    /// Sleep before answering (use with paused tokio time)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn configs(&self) -> Vec<CompletionConfig> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        config: &CompletionConfig,
    ) -> Result<CompletionResult, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((prompt.clone(), config.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (self.responder)(prompt, config).map(CompletionResult::new)
    }
}

/// Phase-one prompts open with the speaker; phase two does too but also
/// carries the colleagues section.
pub fn is_phase_one(prompt: &Prompt) -> bool {
    prompt.user.contains("ANALYZE THIS FAMILY DYNAMIC")
}

pub fn speaks_as(prompt: &Prompt, name: &str) -> bool {
    prompt.user.starts_with(&format!("You are {}", name))
}

/// A plausible structured analysis
pub fn analysis_for(prompt: &Prompt) -> Value {
    let speaker = prompt
        .user
        .strip_prefix("You are ")
        .and_then(|rest| rest.split(',').next())
        .unwrap_or("the team");
    json!({
        "speaker_name": speaker,
        "analysis": {
            "opening_observation": format!("{} notices a familiar silence", speaker),
            "pattern_identification": { "primary_pattern": "appeasing to avoid conflict" },
            "theoretical_framework": { "through_my_lens": "The silence protects the bond" }
        }
    })
}

pub fn mock(client: MockClient) -> Arc<MockClient> {
    Arc::new(client)
}

/// A complete entry created `day` days after 2024-01-01
pub fn entry(id: &str, day: i64) -> JournalEntry {
    JournalEntry {
        id: id.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 19, 0, 0).unwrap() + ChronoDuration::days(day),
        title: Some(format!("Dinner {}", id)),
        moment: Some(Moment {
            raw_text: format!("At dinner {} my father dismissed my promotion.", id),
        }),
        initial_thoughts: Some(InitialThoughts {
            emotions_felt: vec!["hurt".to_string(), "anger".to_string()],
            body_sensations: vec!["tight jaw".to_string()],
            actual_response: Some("I changed the subject.".to_string()),
        }),
        tags: vec!["family".to_string(), "recognition".to_string()],
        analysis: None,
    }
}

pub fn entry_json(id: &str, day: i64) -> Value {
    serde_json::to_value(entry(id, day)).unwrap()
}
