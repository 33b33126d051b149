//! Route handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as UrlPath, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Component, Path, PathBuf};
use tracing::info;

use super::SharedState;
use super::error::{ApiError, ApiResult};
use crate::ai::provider::probe;
use crate::config::SourceKind;
use crate::constants::app;
use crate::research::report::{list_reports, read_report};
use crate::research::sources::create_source;
use crate::types::{ResearchError, SessionId};

#[derive(Debug, Deserialize)]
pub struct ConductRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub output_dir: Option<String>,
}

/// Relative paths without `..` only
fn validate_output_dir(raw: &str) -> ApiResult<PathBuf> {
    let path = Path::new(raw.trim());
    if path.as_os_str().is_empty() {
        return Err(ApiError::bad_request(
            "invalid_output_dir",
            "output_dir must not be empty",
        ));
    }
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(ApiError::bad_request(
            "invalid_output_dir",
            "output_dir must be a relative path without '..'",
        ));
    }
    Ok(path.to_path_buf())
}

pub async fn conduct_research(
    State(state): State<SharedState>,
    payload: Result<Json<ConductRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) =
        payload.map_err(|e| ApiError::bad_request("invalid_request", e.body_text()))?;

    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("invalid_query", "Query is required"));
    }

    let output_dir = match request.output_dir.as_deref() {
        Some(raw) => validate_output_dir(raw)?,
        None => state.config.server.api_output_dir.clone(),
    };

    info!("API research request: {:?}", request.query);
    let envelope = state.runner.conduct(&request.query, &output_dir).await?;

    if envelope.is_success() {
        Ok(Json(serde_json::to_value(&envelope).map_err(ResearchError::from)?))
    } else {
        Err(ApiError::SessionFailed(Box::new(envelope)))
    }
}

pub async fn research_status(
    State(state): State<SharedState>,
    UrlPath(session_id): UrlPath<String>,
) -> ApiResult<Json<Value>> {
    let not_found = || ResearchError::NotFound(format!("session {}", session_id));
    if !SessionId::is_valid(&session_id) {
        return Err(not_found().into());
    }

    let snapshot = state
        .runner
        .sessions()
        .snapshot(&session_id)?
        .ok_or_else(not_found)?;
    Ok(Json(serde_json::to_value(&snapshot).map_err(ResearchError::from)?))
}

pub async fn reports_list(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let reports = list_reports(&state.config.server.reports_root)?;
    Ok(Json(json!({
        "count": reports.len(),
        "reports": reports,
        "timestamp": Utc::now(),
    })))
}

pub async fn report_get(
    State(state): State<SharedState>,
    UrlPath(report_id): UrlPath<String>,
) -> ApiResult<Json<Value>> {
    let doc = read_report(&state.config.server.reports_root, &report_id)?;
    Ok(Json(json!({
        "report_id": doc.report_id,
        "content": doc.content,
        "path": doc.path,
        "size": doc.size,
        "word_count": doc.word_count,
        "timestamp": Utc::now(),
    })))
}

pub async fn source_search(
    State(state): State<SharedState>,
    UrlPath((source, query)): UrlPath<(String, String)>,
) -> ApiResult<Json<Value>> {
    let kind: SourceKind = source
        .parse()
        .map_err(|e: String| ApiError::bad_request("invalid_source", e))?;
    if query.trim().is_empty() {
        return Err(ApiError::bad_request("invalid_query", "Query is required"));
    }

    let source = create_source(kind, state.http.clone(), &state.config.connectors);
    let items = source
        .search(query.trim(), state.config.connectors.max_results)
        .await?;

    Ok(Json(json!({
        "source": kind,
        "query": query,
        "count": items.len(),
        "items": items,
        "timestamp": Utc::now(),
    })))
}

pub async fn system_health(State(state): State<SharedState>) -> Json<Value> {
    let provider = match &state.provider {
        Some(p) => Some(probe(p).await),
        None => None,
    };
    let healthy = provider.as_ref().is_none_or(|p| p.available);

    Json(json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "version": app::VERSION,
        "provider": provider,
        "pipeline": state.runner.status(),
        "timestamp": Utc::now(),
    }))
}

pub async fn system_info() -> Json<Value> {
    Json(json!({
        "name": app::NAME,
        "version": app::VERSION,
        "description": "Research automation pipeline",
        "endpoints": {
            "conduct": "POST /research/conduct",
            "status": "GET /research/status/{session_id}",
            "reports": "GET /reports/list",
            "report": "GET /reports/{report_id}",
            "data": "GET /data/{source}/{query}",
            "health": "GET /system/health",
            "info": "GET /system/info",
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_output_dir() {
        assert_eq!(
            validate_output_dir("research/api").unwrap(),
            PathBuf::from("research/api")
        );
        assert!(validate_output_dir("/etc").is_err());
        assert!(validate_output_dir("a/../../b").is_err());
        assert!(validate_output_dir("  ").is_err());
    }
}
