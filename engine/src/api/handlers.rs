//! Route handlers
//!
//! Bodies are parsed by hand rather than through the `Json` extractor so a
//! malformed request still gets the standard failure envelope.

use super::error::ApiError;
use super::AppState;
use crate::journal::{AnalysisOptions, AnalysisRequest, JournalEntry};
use crate::team::{MemoryEntryStore, RetryOptions, RoleId};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hearth_sdk::errors::EngineError;
use hearth_sdk::types::{ApiAction, ApiRequest, ApiSuccess};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::Instrument;

fn new_request_id() -> String {
    format!("req-{}", uuid::Uuid::new_v4())
}

fn parse_request(body: &Bytes) -> Result<(ApiRequest, ApiAction), EngineError> {
    let request: ApiRequest = serde_json::from_slice(body)
        .map_err(|e| EngineError::Validation(format!("malformed request body: {}", e)))?;
    let action = request
        .parsed_action()
        .map_err(|e| EngineError::InvalidAction(e.0))?;
    Ok((request, action))
}

/// Decode a required section of the request
fn decode<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T, EngineError> {
    T::deserialize(value).map_err(|e| EngineError::Validation(format!("invalid {}: {}", what, e)))
}

/// Decode an optional section, treating `null` as the default
fn decode_or_default<T: DeserializeOwned + Default>(
    value: &Value,
    what: &str,
) -> Result<T, EngineError> {
    if value.is_null() {
        Ok(T::default())
    } else {
        decode(value, what)
    }
}

/// Run `work` for a parsed request and wrap the result in an envelope
async fn respond<F, Fut>(route: &'static str, body: Bytes, work: F) -> Response
where
    F: FnOnce(ApiRequest, ApiAction) -> Fut,
    Fut: std::future::Future<Output = Result<Value, EngineError>>,
{
    let request_id = new_request_id();
    let (request, action) = match parse_request(&body) {
        Ok(parsed) => parsed,
        Err(e) => return ApiError::new(e, request_id).into_response(),
    };

    let span = tracing::info_span!(
        "api_request",
        request_id = %request_id,
        route,
        action = %action
    );

    async move {
        let started = Instant::now();
        tracing::info!(
            data_keys = ?request.data.as_object().map(|o| o.keys().cloned().collect::<Vec<_>>()),
            body_bytes = body.len(),
            "Request received"
        );

        match work(request, action).await {
            Ok(data) => {
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request processed"
                );
                let envelope = ApiSuccess::new(
                    action.as_str(),
                    data,
                    chrono::Utc::now().to_rfc3339(),
                    request_id,
                );
                (StatusCode::OK, Json(envelope)).into_response()
            }
            Err(e) => ApiError::new(e, request_id).into_response(),
        }
    }
    .instrument(span)
    .await
}

// ============================================================================
// /api/journal
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JournalSettings {
    #[serde(default, rename = "includeDSM")]
    include_dsm: bool,
    #[serde(default)]
    enable_extended_assessment: bool,
}

pub async fn journal(State(state): State<AppState>, body: Bytes) -> Response {
    respond("/api/journal", body, |request, action| async move {
        let data = &request.data;
        let content = match action {
            ApiAction::AnalyzeEntry => {
                let settings: JournalSettings = decode_or_default(&request.settings, "settings")?;
                let extended = settings.include_dsm || settings.enable_extended_assessment;
                state.journal.analyze_entry(data, extended).await?
            }
            ApiAction::AutonomousDialogue => state.journal.autonomous_dialogue(data).await?,
            ApiAction::GenerateCheckpoint => state.journal.generate_checkpoint(data).await?,
            ApiAction::DiagnosticAssessment => state.journal.diagnostic_assessment(data).await?,
            other => return Err(EngineError::InvalidAction(other.to_string())),
        };
        Ok(content.into_value())
    })
    .await
}

// ============================================================================
// /api/research-team
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamSettings {
    #[serde(default)]
    quick_mode: Option<bool>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    enable_extended_assessment: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamAnalyzeData {
    entry: JournalEntry,
    #[serde(default)]
    historical_context: Option<String>,
    #[serde(default)]
    previous_entries: Vec<JournalEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamCheckpointData {
    entries: Vec<JournalEntry>,
    #[serde(default)]
    previous_analyses: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SinglePerspectiveData {
    entry: JournalEntry,
    professional: String,
    #[serde(default)]
    historical_context: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetryData {
    subject_id: String,
    #[serde(default)]
    entries: Vec<JournalEntry>,
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::Analysis(e.to_string()))
}

pub async fn research_team(State(state): State<AppState>, body: Bytes) -> Response {
    respond("/api/research-team", body, |request, action| async move {
        let settings: TeamSettings = decode_or_default(&request.settings, "settings")?;
        let data = &request.data;

        match action {
            ApiAction::AnalyzeEntry => {
                let data: TeamAnalyzeData = decode(data, "data")?;
                let budget = match settings.timeout_secs {
                    Some(0) => {
                        return Err(EngineError::Validation(
                            "settings.timeoutSecs must be greater than zero".to_string(),
                        ))
                    }
                    Some(secs) => Duration::from_secs(secs),
                    None => state.team.budget(),
                };
                let options = AnalysisOptions {
                    quick_mode: settings.quick_mode.unwrap_or(false),
                    enable_extended_assessment: settings.enable_extended_assessment,
                };

                let mut analysis = AnalysisRequest::new(data.entry, data.previous_entries, options);
                if let Some(context) = data.historical_context {
                    analysis = analysis.with_historical_context(context);
                }

                let outcome = state.team.analyze_with_budget(&analysis, budget).await?;
                to_value(&outcome)
            }
            ApiAction::GenerateCheckpoint => {
                let data: TeamCheckpointData = decode(data, "data")?;
                let content = state
                    .team
                    .orchestrator()
                    .checkpoint_synthesis(&data.entries, &data.previous_analyses)
                    .await?;
                Ok(content.into_value())
            }
            ApiAction::SinglePerspective => {
                let data: SinglePerspectiveData = decode(data, "data")?;
                let role: RoleId = data.professional.parse().map_err(EngineError::from)?;
                let content = state
                    .team
                    .orchestrator()
                    .single_perspective(
                        role,
                        &data.entry,
                        data.historical_context.as_deref(),
                        settings.quick_mode.unwrap_or(false),
                    )
                    .await?;
                Ok(json!({
                    "professional": role,
                    "analysis": content.into_value(),
                }))
            }
            ApiAction::RetryAnalysis => {
                let data: RetryData = decode(data, "data")?;
                let store = MemoryEntryStore::new(data.entries);
                let options = RetryOptions {
                    quick_mode: settings.quick_mode.unwrap_or(true),
                    enable_extended_assessment: settings.enable_extended_assessment,
                };
                let outcome = state
                    .team
                    .retry_analysis(&store, &data.subject_id, options)
                    .await?;
                to_value(&outcome)
            }
            other => Err(EngineError::InvalidAction(other.to_string())),
        }
    })
    .await
}

// ============================================================================
// /api/health
// ============================================================================

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let healthy = state.client.check_health().await;
    Json(json!({
        "status": if healthy { "ok" } else { "degraded" },
        "provider": state.client.name(),
        "model": state.client.default_model(),
        "healthy": healthy,
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("GIT_COMMIT_HASH"),
    }))
}
