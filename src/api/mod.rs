//! HTTP API
//!
//! Thin axum layer over the pipeline runner. Handlers validate input,
//! delegate to the runner or report store, and map errors to JSON.

pub mod error;
pub mod handlers;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ai::provider::SharedProvider;
use crate::config::Config;
use crate::constants::network::MAX_REQUEST_BODY_BYTES;
use crate::research::PipelineRunner;
use crate::research::sources::http_client;
use crate::types::{ResearchError, Result};

pub use error::{ApiError, ApiResult};

/// Read-only state shared by all handlers
pub struct AppState {
    pub runner: PipelineRunner,
    pub config: Config,
    pub provider: Option<SharedProvider>,
    /// Client for the `/data` passthrough endpoints
    pub http: reqwest::Client,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        runner: PipelineRunner,
        config: Config,
        provider: Option<SharedProvider>,
    ) -> Result<Self> {
        Ok(Self {
            runner,
            config,
            provider,
            http: http_client()?,
        })
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let (runner, provider) = PipelineRunner::bootstrap(&config)?;
        Self::new(runner, config, provider)
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handlers::system_info))
        .route("/research/conduct", post(handlers::conduct_research))
        .route("/research/status/{session_id}", get(handlers::research_status))
        .route("/reports/list", get(handlers::reports_list))
        .route("/reports/{report_id}", get(handlers::report_get))
        .route("/data/{source}/{query}", get(handlers::source_search))
        .route("/system/health", get(handlers::system_health))
        .route("/system/info", get(handlers::system_info))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until Ctrl-C
pub async fn serve(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down API server");
        })
        .await
        .map_err(ResearchError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::{ExtractiveAnalyzer, NullCollector, ReportWriter};
    use crate::research::collector::DataCollector;
    use crate::research::types::{CollectedData, ResearchPlan};
    use crate::research::SessionManager;
    use crate::storage::Database;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct BrokenCollector;

    #[async_trait]
    impl DataCollector for BrokenCollector {
        fn name(&self) -> &str {
            "broken"
        }

        async fn collect(&self, _plan: &ResearchPlan) -> Result<CollectedData> {
            Err(ResearchError::Collection("offline".into()))
        }
    }

    fn state_with(dir: &TempDir, collector: Arc<dyn DataCollector>) -> SharedState {
        let mut config = Config::default();
        config.server.api_output_dir = dir.path().join("api_output");
        config.server.reports_root = dir.path().to_path_buf();

        let db = Arc::new(Database::open_in_memory().unwrap());
        let runner = PipelineRunner::new(
            collector,
            Arc::new(ExtractiveAnalyzer),
            ReportWriter::new("meaning of life"),
        )
        .with_sessions(SessionManager::new(Some(db)));
        Arc::new(AppState::new(runner, config, None).unwrap())
    }

    fn state(dir: &TempDir) -> SharedState {
        state_with(dir, Arc::new(NullCollector))
    }

    async fn send(state: SharedState, req: Request<Body>) -> (StatusCode, Value) {
        let resp = ServiceExt::<Request<Body>>::oneshot(router(state), req)
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_conduct_success_then_status_and_report() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let (status, envelope) = send(
            state.clone(),
            post_json("/research/conduct", serde_json::json!({"query": "graph databases"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope["status"], "completed");
        let session_id = envelope["session_id"].as_str().unwrap().to_string();
        let report_path = envelope["report_path"].as_str().unwrap();
        assert!(report_path.starts_with(dir.path().join("api_output").to_str().unwrap()));

        let (status, snapshot) =
            send(state.clone(), get(&format!("/research/status/{}", session_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["status"], "completed");
        assert_eq!(snapshot["phases"].as_array().unwrap().len(), 4);

        let (status, list) = send(state.clone(), get("/reports/list")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["count"], 1);
        assert_eq!(list["reports"][0]["report_id"], session_id.as_str());

        let (status, report) = send(state, get(&format!("/reports/{}", session_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            report["content"]
                .as_str()
                .unwrap()
                .starts_with("# Research Report: graph databases")
        );
    }

    #[tokio::test]
    async fn test_conduct_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let (status, body) = send(
            state.clone(),
            post_json("/research/conduct", serde_json::json!({"query": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_query");

        let (status, body) = send(
            state.clone(),
            post_json(
                "/research/conduct",
                serde_json::json!({"query": "x", "output_dir": "../outside"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_output_dir");

        let bad_json = Request::builder()
            .method("POST")
            .uri("/research/conduct")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(state, bad_json).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_conduct_failure_returns_envelope() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, Arc::new(BrokenCollector));

        let (status, body) = send(
            state,
            post_json("/research/conduct", serde_json::json!({"query": "anything"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "research_failed");
        assert!(body["message"].as_str().unwrap().contains("offline"));
        assert_eq!(body["envelope"]["status"], "failed");
        assert_eq!(body["session_id"], body["envelope"]["session_id"]);
        assert!(body["envelope"]["report_path"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_ids_are_404() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let (status, body) = send(state.clone(), get("/research/status/deadbeef0000")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, _) = send(state, get("/reports/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_system_endpoints() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let (status, health) = send(state.clone(), get("/system/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["pipeline"]["ready"], true);
        assert!(health["provider"].is_null());

        let (status, info) = send(state.clone(), get("/system/info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(info["name"], "Baker Street Laboratory");

        let (status, root) = send(state, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(root, info);
    }

    #[tokio::test]
    async fn test_unknown_data_source_is_400() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(state(&dir), get("/data/library/books")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_source");
    }
}
