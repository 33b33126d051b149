//! Data collection (phase 2)
//!
//! The configured collector turns a plan into [`CollectedData`]. With no
//! collector the phase yields explicitly empty data; the web collector fans
//! out over its sources with bounded concurrency.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

use super::sources::{SharedSource, create_source, http_client};
use super::types::{CollectedData, ResearchPlan, SourceItem};
use crate::config::{CollectorKind, ConnectorsConfig, FanoutPolicy};
use crate::types::{ResearchError, Result};

#[async_trait]
pub trait DataCollector: Send + Sync {
    fn name(&self) -> &str;

    async fn collect(&self, plan: &ResearchPlan) -> Result<CollectedData>;
}

pub type SharedCollector = Arc<dyn DataCollector>;

pub fn create_collector(config: &ConnectorsConfig) -> Result<SharedCollector> {
    match config.collector {
        CollectorKind::None => Ok(Arc::new(NullCollector)),
        CollectorKind::Web => Ok(Arc::new(WebCollector::from_config(config)?)),
    }
}

/// Collector used when none is configured
pub struct NullCollector;

#[async_trait]
impl DataCollector for NullCollector {
    fn name(&self) -> &str {
        "none"
    }

    async fn collect(&self, _plan: &ResearchPlan) -> Result<CollectedData> {
        Ok(CollectedData::empty())
    }
}

pub struct WebCollector {
    sources: Vec<SharedSource>,
    max_results: usize,
    max_concurrent: usize,
    policy: FanoutPolicy,
}

impl WebCollector {
    pub fn new(sources: Vec<SharedSource>) -> Self {
        let defaults = ConnectorsConfig::default();
        Self {
            sources,
            max_results: defaults.max_results,
            max_concurrent: defaults.max_concurrent_sources,
            policy: defaults.fanout_policy,
        }
    }

    pub fn from_config(config: &ConnectorsConfig) -> Result<Self> {
        let client = http_client()?;
        let sources = config
            .sources
            .iter()
            .map(|kind| create_source(*kind, client.clone(), config))
            .collect();
        Ok(Self::new(sources)
            .with_max_results(config.max_results)
            .with_max_concurrent(config.max_concurrent_sources)
            .with_policy(config.fanout_policy))
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_policy(mut self, policy: FanoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }
}

#[async_trait]
impl DataCollector for WebCollector {
    fn name(&self) -> &str {
        "web"
    }

    async fn collect(&self, plan: &ResearchPlan) -> Result<CollectedData> {
        let max_results = self.max_results;
        let searches: Vec<_> = self
            .sources
            .iter()
            .cloned()
            .enumerate()
            .map(|(idx, source)| {
                let query = plan.query.clone();
                async move {
                    let result = source.search(&query, max_results).await;
                    (idx, source.name().to_string(), result)
                }
            })
            .collect();

        let mut pending = stream::iter(searches).buffer_unordered(self.max_concurrent);

        let mut answered: Vec<(usize, Vec<SourceItem>)> = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        while let Some((idx, name, result)) = pending.next().await {
            match result {
                Ok(items) => answered.push((idx, items)),
                Err(e) => match self.policy {
                    FanoutPolicy::FailFast => {
                        return Err(ResearchError::Collection(format!(
                            "source {} failed: {}",
                            name, e
                        )));
                    }
                    FanoutPolicy::BestEffort => {
                        warn!("Skipping source {}: {}", name, e);
                        failures.push(format!("{}: {}", name, e));
                    }
                },
            }
        }

        if answered.is_empty() && !failures.is_empty() {
            return Err(ResearchError::Collection(format!(
                "all sources failed ({})",
                failures.join("; ")
            )));
        }

        // Completion order is nondeterministic; report in configured order
        answered.sort_by_key(|(idx, _)| *idx);
        let items: Vec<SourceItem> = answered.into_iter().flat_map(|(_, items)| items).collect();

        let data = CollectedData::from_items(items, self.source_names());
        info!(
            "Collected {} items from {} sources (quality {:.2})",
            data.total_items(),
            data.sources_queried.len(),
            data.quality_score
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::planner::analyze_query;
    use crate::research::sources::{DataSource, WikipediaSource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeSource {
        name: &'static str,
        items: usize,
        fail: bool,
        delay_ms: u64,
    }

    impl FakeSource {
        fn ok(name: &'static str, items: usize) -> SharedSource {
            Arc::new(Self {
                name,
                items,
                fail: false,
                delay_ms: 0,
            })
        }

        fn failing(name: &'static str) -> SharedSource {
            Arc::new(Self {
                name,
                items: 0,
                fail: true,
                delay_ms: 0,
            })
        }
    }

    #[async_trait]
    impl DataSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        fn category(&self) -> &str {
            "web"
        }

        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            if self.fail {
                return Err(ResearchError::Collection(format!("{} is down", self.name)));
            }
            Ok((0..self.items.min(max_results))
                .map(|i| SourceItem {
                    source: self.name.to_string(),
                    category: "web".to_string(),
                    title: format!("{} result {} for {}", self.name, i, query),
                    snippet: String::new(),
                    url: None,
                })
                .collect())
        }
    }

    struct CountingSource {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DataSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn category(&self) -> &str {
            "web"
        }

        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SourceItem>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn plan() -> ResearchPlan {
        analyze_query("history of computing").unwrap()
    }

    #[tokio::test]
    async fn test_null_collector_is_empty() {
        let data = NullCollector.collect(&plan()).await.unwrap();
        assert!(data.is_empty());
        assert!(data.sources_queried.is_empty());
        assert_eq!(data.quality_score, 0.0);
    }

    #[tokio::test]
    async fn test_best_effort_skips_failures() {
        let collector = WebCollector::new(vec![
            FakeSource::ok("alpha", 2),
            FakeSource::failing("beta"),
            FakeSource::ok("gamma", 1),
            FakeSource::ok("delta", 0),
        ]);

        let data = collector.collect(&plan()).await.unwrap();
        assert_eq!(data.total_items(), 3);
        assert_eq!(data.sources_queried, vec!["alpha", "beta", "gamma", "delta"]);
        assert_eq!(data.quality_score, 0.5);
    }

    #[tokio::test]
    async fn test_best_effort_all_failed_is_error() {
        let collector =
            WebCollector::new(vec![FakeSource::failing("a"), FakeSource::failing("b")]);
        let err = collector.collect(&plan()).await.unwrap_err();
        assert!(matches!(err, ResearchError::Collection(_)));
        assert!(err.to_string().contains("all sources failed"));
    }

    #[tokio::test]
    async fn test_fail_fast_propagates_first_error() {
        let collector = WebCollector::new(vec![FakeSource::ok("a", 1), FakeSource::failing("b")])
            .with_policy(FanoutPolicy::FailFast);
        let err = collector.collect(&plan()).await.unwrap_err();
        assert!(err.to_string().contains("b is down"));
    }

    #[tokio::test]
    async fn test_items_keep_configured_order() {
        let slow: SharedSource = Arc::new(FakeSource {
            name: "slow",
            items: 1,
            fail: false,
            delay_ms: 30,
        });
        let collector = WebCollector::new(vec![slow, FakeSource::ok("fast", 1)]);

        let data = collector.collect(&plan()).await.unwrap();
        assert_eq!(data.items[0].source, "slow");
        assert_eq!(data.items[1].source, "fast");
    }

    #[tokio::test]
    async fn test_collect_runs_on_spawned_task() {
        let collector: SharedCollector = Arc::new(
            WebCollector::new(vec![FakeSource::ok("alpha", 2), FakeSource::ok("beta", 1)])
                .with_max_concurrent(1),
        );
        let plan = plan();

        let data = tokio::spawn(async move { collector.collect(&plan).await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data.total_items(), 3);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let sources: Vec<SharedSource> = (0..6)
            .map(|_| {
                Arc::new(CountingSource {
                    active: active.clone(),
                    peak: peak.clone(),
                }) as SharedSource
            })
            .collect();

        WebCollector::new(sources)
            .with_max_concurrent(2)
            .collect(&plan())
            .await
            .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_wikipedia_against_local_server() {
        use axum::{Json, Router, routing::get};
        use serde_json::json;

        let app = Router::new().route(
            "/w/api.php",
            get(|| async {
                Json(json!({"query": {"search": [
                    {"title": "Analytical Engine", "snippet": "A proposed <b>computer</b>"}
                ]}}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let source: SharedSource = Arc::new(
            WikipediaSource::new(http_client().unwrap())
                .with_endpoint(format!("http://{}/w/api.php", addr)),
        );
        let data = WebCollector::new(vec![source])
            .collect(&plan())
            .await
            .unwrap();

        assert_eq!(data.total_items(), 1);
        assert_eq!(data.items[0].snippet, "A proposed computer");
        assert_eq!(data.sources_by_category["web"], 1);
        assert_eq!(data.quality_score, 1.0);
    }

    #[test]
    fn test_create_collector_by_kind() {
        let mut config = ConnectorsConfig::default();
        assert_eq!(create_collector(&config).unwrap().name(), "none");
        config.collector = CollectorKind::Web;
        assert_eq!(create_collector(&config).unwrap().name(), "web");
    }
}
