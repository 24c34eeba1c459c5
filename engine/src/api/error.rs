//! Error conversion and failure envelopes for the HTTP surface

use crate::journal::JournalError;
use crate::llm::LLMError;
use crate::prompt::PromptError;
use crate::team::{ErrorKind, OrchestrationError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hearth_sdk::errors::{EngineError, HearthErrorExt};
use hearth_sdk::types::ApiFailure;

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        if err.is_timeout() {
            return EngineError::Timeout(err.to_string());
        }
        match err {
            LLMError::Upstream { status, body } => EngineError::Upstream {
                status,
                message: body,
            },
            LLMError::AuthenticationFailed { body, .. } => EngineError::Unauthorized(body),
            LLMError::RateLimitExceeded(_) => EngineError::RateLimited,
            LLMError::InvalidRequest(msg) => EngineError::Validation(msg),
            LLMError::NetworkError(msg) => EngineError::Network(msg),
            LLMError::ParseError(msg) => EngineError::InvalidResponse(msg),
            LLMError::Timeout => EngineError::Timeout("completion call timed out".to_string()),
        }
    }
}

impl From<PromptError> for EngineError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::MissingField { .. } => EngineError::MissingField(err.to_string()),
            PromptError::InvalidField { .. } | PromptError::UnknownRole(_) => {
                EngineError::Validation(err.to_string())
            }
            PromptError::InvalidRoster(msg) => EngineError::Config(msg),
        }
    }
}

impl From<OrchestrationError> for EngineError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::Prompt(e) => e.into(),
            OrchestrationError::Completion(e) => e.into(),
            OrchestrationError::PhaseOneFailed { .. } => match err.decisive_failure() {
                Some(info) if info.kind == ErrorKind::Authentication => {
                    EngineError::Unauthorized(info.message.clone())
                }
                Some(info) if info.is_timeout() => EngineError::Timeout(info.message.clone()),
                _ => EngineError::Analysis(err.to_string()),
            },
            OrchestrationError::SubjectNotFound(id) => EngineError::NotFound(id),
            OrchestrationError::Store(e) => EngineError::Analysis(e.to_string()),
        }
    }
}

impl From<JournalError> for EngineError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::Prompt(e) => e.into(),
            JournalError::Completion(e) => e.into(),
        }
    }
}

/// HTTP status for an engine error
pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidAction(_)
        | EngineError::Validation(_)
        | EngineError::MissingField(_)
        | EngineError::NotFound(_) => StatusCode::BAD_REQUEST,
        EngineError::Unauthorized(_) | EngineError::MissingCredential(_) => {
            StatusCode::UNAUTHORIZED
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An engine error bound to the request it failed
#[derive(Debug)]
pub struct ApiError {
    pub error: EngineError,
    pub request_id: String,
}

impl ApiError {
    pub fn new(error: impl Into<EngineError>, request_id: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            request_id: request_id.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        let label = if matches!(self.error, EngineError::InvalidAction(_)) {
            "Invalid action"
        } else {
            "Processing failed"
        };

        if status.is_server_error() {
            tracing::error!(
                request_id = %self.request_id,
                status = status.as_u16(),
                error = %self.error,
                recoverable = self.error.is_recoverable(),
                "Request failed"
            );
        } else {
            tracing::warn!(
                request_id = %self.request_id,
                status = status.as_u16(),
                error = %self.error,
                "Request rejected"
            );
        }

        let body = ApiFailure {
            error: label.to_string(),
            message: self.error.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: self.request_id,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::{ErrorInfo, RoleId};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&EngineError::InvalidAction("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&EngineError::Unauthorized("bad key".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&EngineError::Upstream {
                status: 500,
                message: String::new()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: EngineError = LLMError::AuthenticationFailed {
            status: 401,
            body: "Incorrect API key".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Unauthorized(_)));

        let err: EngineError = LLMError::Upstream {
            status: 504,
            body: String::new(),
        }
        .into();
        assert!(matches!(err, EngineError::Timeout(_)));
    }

    #[test]
    fn test_prompt_error_is_client_error() {
        let err: EngineError = PromptError::MissingField {
            template: crate::prompt::TemplateId::EntryAnalysis,
            field: "entry.title".to_string(),
        }
        .into();
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("entry.title"));
    }

    #[test]
    fn test_phase_one_auth_failure_is_unauthorized() {
        let info = ErrorInfo::from(&LLMError::AuthenticationFailed {
            status: 401,
            body: "invalid key".to_string(),
        });
        let err: EngineError = OrchestrationError::PhaseOneFailed {
            failures: vec![(RoleId::CbtAnalyst, info.clone())],
            first: info,
        }
        .into();
        assert_eq!(status_for(&err), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_phase_one_auth_failure_outranks_earlier_timeout() {
        let timeout = ErrorInfo::from(&LLMError::Timeout);
        let rejected = ErrorInfo::from(&LLMError::AuthenticationFailed {
            status: 401,
            body: "invalid key".to_string(),
        });
        let err: EngineError = OrchestrationError::PhaseOneFailed {
            failures: vec![
                (RoleId::PsychodynamicAnalyst, timeout.clone()),
                (RoleId::FamilySystemsTherapist, rejected),
            ],
            first: timeout,
        }
        .into();
        assert!(matches!(err, EngineError::Unauthorized(ref msg) if msg.contains("invalid key")));
    }
}
