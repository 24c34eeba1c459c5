use super::{
    parse_json_content, CompletionClient, CompletionConfig, CompletionContent, CompletionResult,
    LLMError, Prompt, TokenUsage,
};
use crate::secrets::{scrub, ApiKey};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Completion client for OpenAI-compatible `/chat/completions` endpoints
pub struct OpenAICompletionClient {
    base_url: String,
    model: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl OpenAICompletionClient {
    /// Build a client whose every request is bounded by `timeout`
    ///
    /// A request that runs past `timeout` fails with `LLMError::Timeout`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: ApiKey,
        timeout: Duration,
    ) -> super::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hearth-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LLMError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url,
            model: model.into(),
            api_key,
            client,
        })
    }

    fn map_status(status: u16, body: String) -> LLMError {
        let body = scrub(&body);
        match status {
            401 | 403 => LLMError::AuthenticationFailed { status, body },
            429 => LLMError::RateLimitExceeded(body),
            _ => LLMError::Upstream { status, body },
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompletionClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn check_health(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        config: &CompletionConfig,
    ) -> super::Result<CompletionResult> {
        config.validate()?;

        let url = format!("{}/chat/completions", self.base_url);
        let model = config.model.as_deref().unwrap_or(&self.model);

        let api_messages: Vec<serde_json::Value> = prompt
            .messages()
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let mut payload = json!({
            "model": model,
            "messages": api_messages,
            "temperature": config.temperature,
            "max_tokens": config.max_output_tokens,
        });
        if config.expect_json {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        tracing::debug!(
            model,
            temperature = config.temperature,
            max_output_tokens = config.max_output_tokens,
            expect_json = config.expect_json,
            system_chars = prompt.system.len(),
            user_chars = prompt.user.len(),
            estimated_tokens = prompt.estimated_tokens(),
            "Sending completion request"
        );

        let authorization = self.api_key.bearer_header().map_err(|_| {
            LLMError::InvalidRequest("API key is not a valid header value".to_string())
        })?;

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(scrub(&e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let err = Self::map_status(status, text);
            tracing::warn!(status, error = %err, "Completion request failed");
            return Err(err);
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| LLMError::ParseError("No message in choice".to_string()))?;

        let text = message
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| LLMError::ParseError("Empty content".to_string()))?;

        let finish_reason = choice
            .get("finish_reason")
            .and_then(|f| f.as_str())
            .map(str::to_string);

        let usage = data
            .get("usage")
            .and_then(|u| serde_json::from_value::<TokenUsage>(u.clone()).ok());

        let content = if config.expect_json {
            parse_json_content(text)
        } else {
            CompletionContent::Text(text.to_string())
        };

        if content.is_parse_error() {
            tracing::warn!(
                finish_reason = finish_reason.as_deref().unwrap_or("unknown"),
                content_chars = text.len(),
                "Completion content was not valid JSON"
            );
        }

        if let Some(usage) = usage {
            tracing::info!(
                model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                finish_reason = finish_reason.as_deref().unwrap_or("unknown"),
                "Completion finished"
            );
        }

        Ok(CompletionResult {
            content,
            model: data
                .get("model")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            usage,
            finish_reason,
        })
    }
}
