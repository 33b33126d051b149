//! Pipeline Runner
//!
//! Drives one session through plan → collect → analyze → report. Phases run
//! strictly in order; connector calls run under per-phase timeouts. Any
//! phase error fails the session and yields a failed envelope, and no
//! report is left behind.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use super::analyzer::{SharedAnalyzer, create_analyzer};
use super::collector::{SharedCollector, create_collector};
use super::generator::{SharedGenerator, create_generator};
use super::planner::analyze_query;
use super::report::ReportWriter;
use super::session::SessionManager;
use super::types::{
    AnalysisResult, ReportArtifact, ResearchPlan, ResearchSession, ResultEnvelope,
};
use crate::ai::provider::{SharedProvider, create_provider};
use crate::ai::timeout::with_timeout;
use crate::config::{AgentRegistry, Config, ConnectorsConfig};
use crate::storage::{SharedDatabase, open_store};
use crate::types::{ResearchError, Result};

/// Phase names as recorded in the session store
pub mod phase {
    pub const PLAN: &str = "plan";
    pub const COLLECT: &str = "collect";
    pub const ANALYZE: &str = "analyze";
    pub const REPORT: &str = "report";
}

#[derive(Debug, Clone, Copy)]
pub struct PhaseTimeouts {
    pub collection: Duration,
    pub analysis: Duration,
    pub generation: Duration,
}

impl From<&ConnectorsConfig> for PhaseTimeouts {
    fn from(config: &ConnectorsConfig) -> Self {
        Self {
            collection: config.collection_timeout(),
            analysis: config.analysis_timeout(),
            generation: config.generation_timeout(),
        }
    }
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self::from(&ConnectorsConfig::default())
    }
}

/// Readiness snapshot for `status` and `/system/health`
#[derive(Debug, Clone, Serialize)]
pub struct RunnerStatus {
    pub ready: bool,
    pub collector: String,
    pub analyzer: String,
    pub text_generation: Option<String>,
    pub session_store: bool,
    pub agents_configured: usize,
    pub tools_available: usize,
    pub timestamp: DateTime<Utc>,
}

pub struct PipelineRunner {
    sessions: SessionManager,
    collector: SharedCollector,
    analyzer: SharedAnalyzer,
    generator: Option<SharedGenerator>,
    writer: ReportWriter,
    timeouts: PhaseTimeouts,
    agents: AgentRegistry,
}

impl PipelineRunner {
    pub fn new(collector: SharedCollector, analyzer: SharedAnalyzer, writer: ReportWriter) -> Self {
        Self {
            sessions: SessionManager::default(),
            collector,
            analyzer,
            generator: None,
            writer,
            timeouts: PhaseTimeouts::default(),
            agents: AgentRegistry::default(),
        }
    }

    /// Wire connectors from configuration
    pub fn from_config(
        config: &Config,
        provider: Option<SharedProvider>,
        store: Option<SharedDatabase>,
    ) -> Result<Self> {
        let collector = create_collector(&config.connectors)?;
        let analyzer = create_analyzer(&config.connectors, provider.clone())?;
        let generator = create_generator(&config.connectors, provider);
        let writer = ReportWriter::from_config(&config.research)?;
        let agents = AgentRegistry::load(&config.research.agents_file)?;

        Ok(Self::new(collector, analyzer, writer)
            .with_sessions(SessionManager::new(store))
            .with_generator(generator)
            .with_timeouts(PhaseTimeouts::from(&config.connectors))
            .with_agents(agents))
    }

    /// Create the LLM provider and session store from config, then wire the runner
    pub fn bootstrap(config: &Config) -> Result<(Self, Option<SharedProvider>)> {
        let provider = create_provider(&config.llm)?;
        let store = open_store(&config.storage)?;
        let runner = Self::from_config(config, provider.clone(), store)?;
        Ok((runner, provider))
    }

    pub fn with_sessions(mut self, sessions: SessionManager) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_generator(mut self, generator: Option<SharedGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_timeouts(mut self, timeouts: PhaseTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_agents(mut self, agents: AgentRegistry) -> Self {
        self.agents = agents;
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Validate the query, open a session in `output_dir` and run it.
    ///
    /// Errors are returned only when no session could be started; phase
    /// failures come back as a failed envelope.
    pub async fn conduct(&self, query: &str, output_dir: &Path) -> Result<ResultEnvelope> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResearchError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }

        let mut session = self.sessions.open_session(query, output_dir).await?;
        Ok(self.run(&mut session).await)
    }

    /// Run all four phases for an active session
    #[instrument(skip(self, session), fields(session_id = %session.session_id))]
    pub async fn run(&self, session: &mut ResearchSession) -> ResultEnvelope {
        if session.status.is_terminal() {
            let err = ResearchError::InvalidTransition {
                session_id: session.session_id.to_string(),
                from: session.status.to_string(),
                to: "active".to_string(),
            };
            return ResultEnvelope::failed(session, &err.to_string());
        }

        info!("Starting research pipeline for {:?}", session.query);
        let started = Instant::now();

        let (report, summary) = match self.execute(session).await {
            Ok(done) => done,
            Err(e) => return self.fail(session, &e),
        };

        if let Err(e) = self.sessions.complete_session(session, &report, &summary) {
            if let Err(rm) = tokio::fs::remove_file(&report.path).await {
                warn!("Failed to remove report {}: {}", report.path.display(), rm);
            }
            return self.fail(session, &e);
        }

        info!(
            "Research pipeline completed in {:.1}s",
            started.elapsed().as_secs_f64()
        );
        ResultEnvelope::completed(session, &report, summary)
    }

    async fn execute(&self, session: &ResearchSession) -> Result<(ReportArtifact, String)> {
        let plan = self
            .phase(session, phase::PLAN, async { analyze_query(&session.query) })
            .await?;
        info!(
            "Plan: category={}, concepts={:?}",
            plan.category, plan.key_concepts
        );

        let data = self
            .phase(session, phase::COLLECT, async {
                with_timeout(
                    self.timeouts.collection,
                    self.collector.collect(&plan),
                    "data collection",
                )
                .await
                .map_err(as_collection_error)
            })
            .await?;

        let analysis = self
            .phase(session, phase::ANALYZE, async {
                with_timeout(
                    self.timeouts.analysis,
                    self.analyzer.analyze(&data, &plan),
                    "data analysis",
                )
                .await
                .map_err(as_analysis_error)
            })
            .await?;

        let report = self
            .phase(session, phase::REPORT, async {
                let executive = self.executive_summary(&plan, &analysis).await;
                self.writer
                    .generate_report(
                        &session.query,
                        &analysis,
                        &session.output_dir,
                        &session.session_id,
                        executive.as_deref(),
                    )
                    .await
            })
            .await?;

        let summary = format!(
            "Research report generated successfully: {} key findings, confidence {:.2}",
            analysis.key_findings.len(),
            analysis.confidence
        );
        Ok((report, summary))
    }

    /// Optional generated summary; any failure falls back to the template text
    async fn executive_summary(
        &self,
        plan: &ResearchPlan,
        analysis: &AnalysisResult,
    ) -> Option<String> {
        let generator = self.generator.as_ref()?;
        match with_timeout(
            self.timeouts.generation,
            generator.executive_summary(plan, analysis),
            "summary generation",
        )
        .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Summary generation via {} failed, using default: {}", generator.name(), e);
                None
            }
        }
    }

    async fn phase<T, F>(&self, session: &ResearchSession, name: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = fut.await;
        let error = result.as_ref().err().map(|e| e.to_string());
        self.sessions
            .record_phase(session, name, started.elapsed(), error.as_deref());
        result
    }

    fn fail(&self, session: &mut ResearchSession, error: &ResearchError) -> ResultEnvelope {
        let message = error.to_string();
        if let Err(e) = self.sessions.fail_session(session, &message) {
            warn!("Could not record failure for {}: {}", session.session_id, e);
        }
        ResultEnvelope::failed(session, &message)
    }

    pub fn status(&self) -> RunnerStatus {
        RunnerStatus {
            ready: true,
            collector: self.collector.name().to_string(),
            analyzer: self.analyzer.name().to_string(),
            text_generation: self.generator.as_ref().map(|g| g.name().to_string()),
            session_store: self.sessions.has_store(),
            agents_configured: self.agents.agent_count(),
            tools_available: self.agents.tool_count(),
            timestamp: Utc::now(),
        }
    }
}

fn as_collection_error(e: ResearchError) -> ResearchError {
    match e {
        ResearchError::Collection(_) => e,
        other => ResearchError::Collection(other.to_string()),
    }
}

fn as_analysis_error(e: ResearchError) -> ResearchError {
    match e {
        ResearchError::Analysis(_) => e,
        other => ResearchError::Analysis(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::testing::MockProvider;
    use crate::research::analyzer::{Analyzer, ExtractiveAnalyzer};
    use crate::research::collector::{DataCollector, NullCollector};
    use crate::research::generator::LlmSummaryGenerator;
    use crate::research::types::{CollectedData, SessionStatus, SourceItem};
    use crate::storage::Database;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct BrokenCollector;

    #[async_trait]
    impl DataCollector for BrokenCollector {
        fn name(&self) -> &str {
            "broken"
        }

        async fn collect(&self, _plan: &ResearchPlan) -> Result<CollectedData> {
            Err(ResearchError::Collection("upstream unavailable".to_string()))
        }
    }

    struct SlowCollector;

    #[async_trait]
    impl DataCollector for SlowCollector {
        fn name(&self) -> &str {
            "slow"
        }

        async fn collect(&self, _plan: &ResearchPlan) -> Result<CollectedData> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CollectedData::empty())
        }
    }

    /// Fails only for queries containing "fail"
    struct SelectiveCollector;

    #[async_trait]
    impl DataCollector for SelectiveCollector {
        fn name(&self) -> &str {
            "selective"
        }

        async fn collect(&self, plan: &ResearchPlan) -> Result<CollectedData> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if plan.query.contains("fail") {
                return Err(ResearchError::Collection("selected to fail".into()));
            }
            Ok(CollectedData::from_items(
                vec![SourceItem {
                    source: "fixture".into(),
                    category: "web".into(),
                    title: plan.query.clone(),
                    snippet: "Fixture material.".into(),
                    url: None,
                }],
                vec!["fixture".into()],
            ))
        }
    }

    struct WrongKindAnalyzer;

    #[async_trait]
    impl Analyzer for WrongKindAnalyzer {
        fn name(&self) -> &str {
            "wrong"
        }

        async fn analyze(&self, _d: &CollectedData, _p: &ResearchPlan) -> Result<AnalysisResult> {
            Err(ResearchError::LlmApi("model exploded".into()))
        }
    }

    fn runner(collector: SharedCollector) -> PipelineRunner {
        PipelineRunner::new(
            collector,
            Arc::new(ExtractiveAnalyzer),
            ReportWriter::new("meaning of life"),
        )
    }

    fn reports_in(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("research_report_"))
            .collect()
    }

    #[tokio::test]
    async fn test_success_writes_exactly_one_report() {
        let dir = TempDir::new().unwrap();
        let envelope = runner(Arc::new(NullCollector))
            .conduct("Latest developments in AI research", dir.path())
            .await
            .unwrap();

        assert!(envelope.is_success());
        let reports = reports_in(dir.path());
        assert_eq!(reports, vec![format!("research_report_{}.md", envelope.session_id)]);

        let report_path = envelope.report_path.unwrap();
        assert_eq!(
            Path::new(&report_path),
            dir.path().join(&reports[0]).as_path()
        );
        assert!(envelope.error.is_none());
    }

    #[tokio::test]
    async fn test_failing_collector_fails_session_without_report() {
        let dir = TempDir::new().unwrap();
        let runner = runner(Arc::new(BrokenCollector));
        let mut session = runner
            .sessions()
            .open_session("quantum", dir.path())
            .await
            .unwrap();

        let envelope = runner.run(&mut session).await;

        assert_eq!(session.status, SessionStatus::Failed);
        assert!(session.completed_at.is_some());
        assert!(session.error.as_deref().unwrap().contains("upstream unavailable"));
        assert!(!envelope.is_success());
        assert_eq!(envelope.summary, "Research failed");
        assert!(envelope.report_path.is_none());
        assert!(reports_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_collection_timeout_is_collection_error() {
        let dir = TempDir::new().unwrap();
        let runner = runner(Arc::new(SlowCollector)).with_timeouts(PhaseTimeouts {
            collection: Duration::from_millis(20),
            ..Default::default()
        });

        let envelope = runner.conduct("slow topic", dir.path()).await.unwrap();
        let error = envelope.error.unwrap();
        assert!(error.starts_with("Data collection failed"));
        assert!(error.contains("Timeout"));
    }

    #[tokio::test]
    async fn test_analyzer_errors_become_analysis_errors() {
        let dir = TempDir::new().unwrap();
        let runner = PipelineRunner::new(
            Arc::new(NullCollector),
            Arc::new(WrongKindAnalyzer),
            ReportWriter::new("meaning of life"),
        );

        let envelope = runner.conduct("topic", dir.path()).await.unwrap();
        assert!(envelope.error.unwrap().starts_with("Data analysis failed"));
        assert!(reports_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_session() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("never");
        let err = runner(Arc::new(NullCollector))
            .conduct("   ", &out)
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::InvalidQuery(_)));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let dir = TempDir::new().unwrap();
        let runner = runner(Arc::new(SelectiveCollector));

        let (ok, failed) = tokio::join!(
            runner.conduct("good topic", dir.path()),
            runner.conduct("please fail", dir.path())
        );
        let ok = ok.unwrap();
        let failed = failed.unwrap();

        assert!(ok.is_success());
        assert!(!failed.is_success());
        assert_ne!(ok.session_id, failed.session_id);
        assert_eq!(
            reports_in(dir.path()),
            vec![format!("research_report_{}.md", ok.session_id)]
        );
    }

    #[tokio::test]
    async fn test_rerunning_terminal_session_does_not_change_it() {
        let dir = TempDir::new().unwrap();
        let runner = runner(Arc::new(NullCollector));
        let mut session = runner.sessions().open_session("q", dir.path()).await.unwrap();

        assert!(runner.run(&mut session).await.is_success());
        let completed_at = session.completed_at;

        let again = runner.run(&mut session).await;
        assert!(!again.is_success());
        assert!(again.error.unwrap().contains("cannot move"));
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.completed_at, completed_at);
        assert_eq!(reports_in(dir.path()).len(), 1);
    }

    #[tokio::test]
    async fn test_phases_recorded_in_store() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let runner =
            runner(Arc::new(BrokenCollector)).with_sessions(SessionManager::new(Some(db.clone())));

        let envelope = runner.conduct("q", dir.path()).await.unwrap();
        let snapshot = db.session_snapshot(&envelope.session_id).unwrap().unwrap();

        assert_eq!(snapshot.session.status, SessionStatus::Failed);
        let phases: Vec<_> = snapshot.phases.iter().map(|p| p.phase.as_str()).collect();
        assert_eq!(phases, vec![phase::PLAN, phase::COLLECT]);
        assert_eq!(snapshot.phases[1].status, "failed");
        assert!(snapshot.outputs.is_empty());
    }

    #[tokio::test]
    async fn test_generator_summary_used_and_failure_falls_back() {
        let dir = TempDir::new().unwrap();

        let good = LlmSummaryGenerator::new(
            MockProvider::replying(json!({"executive_summary": "Generated opening."})).shared(),
        );
        let generating = runner(Arc::new(NullCollector)).with_generator(Some(Arc::new(good)));
        let envelope = generating.conduct("topic one", dir.path()).await.unwrap();
        let content = std::fs::read_to_string(envelope.report_path.unwrap()).unwrap();
        assert!(content.contains("Generated opening."));

        let slow = LlmSummaryGenerator::new(
            MockProvider::replying(json!({"executive_summary": "late"}))
                .with_delay(Duration::from_secs(5))
                .shared(),
        );
        let timing_out = runner(Arc::new(NullCollector))
            .with_generator(Some(Arc::new(slow)))
            .with_timeouts(PhaseTimeouts {
                generation: Duration::from_millis(20),
                ..Default::default()
            });
        let envelope = timing_out.conduct("topic two", dir.path()).await.unwrap();
        assert!(envelope.is_success());
        let content = std::fs::read_to_string(envelope.report_path.unwrap()).unwrap();
        assert!(content.contains("This report presents research findings on: topic two"));
    }

    #[test]
    fn test_status_reports_connectors() {
        let status = runner(Arc::new(NullCollector)).status();
        assert!(status.ready);
        assert_eq!(status.collector, "none");
        assert_eq!(status.analyzer, "extractive");
        assert!(status.text_generation.is_none());
        assert!(!status.session_store);
    }

    #[test]
    fn test_from_config_defaults() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.research.agents_file = dir.path().join("agents.yaml");

        let runner = PipelineRunner::from_config(&config, None, None).unwrap();
        let status = runner.status();
        assert_eq!(status.collector, "none");
        assert_eq!(status.agents_configured, 0);
    }
}
