//! JSON error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::research::ResultEnvelope;
use crate::types::ResearchError;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body or parameters
    BadRequest { kind: &'static str, message: String },
    Research(ResearchError),
    /// The pipeline ran and the session failed
    SessionFailed(Box<ResultEnvelope>),
}

impl ApiError {
    pub fn bad_request(kind: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            kind,
            message: message.into(),
        }
    }
}

impl From<ResearchError> for ApiError {
    fn from(err: ResearchError) -> Self {
        Self::Research(err)
    }
}

fn status_for(err: &ResearchError) -> StatusCode {
    match err {
        ResearchError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        ResearchError::NotFound(_) => StatusCode::NOT_FOUND,
        ResearchError::Collection(_) => StatusCode::BAD_GATEWAY,
        ResearchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest { kind, message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": kind, "message": message})),
            )
                .into_response(),
            ApiError::Research(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", err);
                }
                (
                    status,
                    Json(json!({"error": err.kind(), "message": err.to_string()})),
                )
                    .into_response()
            }
            ApiError::SessionFailed(envelope) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "research_failed",
                    "message": envelope.error.clone().unwrap_or_default(),
                    "session_id": envelope.session_id,
                    "envelope": envelope,
                })),
            )
                .into_response(),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
