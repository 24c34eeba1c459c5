//! Inbound HTTP API
//!
//! # Endpoints
//!
//! - POST /api/journal - single-call journal actions
//! - POST /api/research-team - team analysis, team checkpoint, single perspective, retry
//! - GET /api/health - completion backend status
//!
//! `CorsLayer` answers every `OPTIONS` request with 200 and permissive CORS
//! headers; the routes themselves only accept their documented method.

use crate::config::Config;
use crate::journal::JournalAnalyst;
use crate::llm::CompletionClient;
use crate::prompt::PromptAssembler;
use crate::team::{Roster, TeamOrchestrator, TimeoutFallbackPolicy};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use hearth_sdk::errors::EngineError;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

pub mod error;
mod handlers;

pub use error::{status_for, ApiError};

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn CompletionClient>,
    pub journal: Arc<JournalAnalyst>,
    pub team: Arc<TimeoutFallbackPolicy>,
}

impl AppState {
    /// Wire the analysts around one shared completion client
    pub fn new(client: Arc<dyn CompletionClient>, config: &Config) -> Self {
        let roster = Arc::new(Roster::default());
        let journal = JournalAnalyst::new(Arc::clone(&client), PromptAssembler::new(Arc::clone(&roster)));
        let orchestrator = TeamOrchestrator::new(Arc::clone(&client), roster, &config.team);
        let team = TimeoutFallbackPolicy::new(Arc::new(orchestrator), config.team.analysis_budget());

        Self {
            client,
            journal: Arc::new(journal),
            team: Arc::new(team),
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/journal", post(handlers::journal))
        .route("/api/research-team", post(handlers::research_team))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &Config, state: AppState) -> Result<(), EngineError> {
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("API server shutting down gracefully");
        })
        .await
        .map_err(|e| EngineError::Network(format!("API server error: {}", e)))?;

    Ok(())
}
