//! Executive summary generation
//!
//! Optional text-generation connector used while building the report. The
//! pipeline treats it as an enhancement: on error or timeout the report
//! falls back to its deterministic summary.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{AnalysisResult, ResearchPlan};
use crate::ai::prompt::{summary_prompt, summary_schema};
use crate::ai::provider::SharedProvider;
use crate::config::ConnectorsConfig;
use crate::types::utils::{collapse_whitespace, json_string};
use crate::types::{ResearchError, Result};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn executive_summary(
        &self,
        plan: &ResearchPlan,
        analysis: &AnalysisResult,
    ) -> Result<String>;
}

pub type SharedGenerator = Arc<dyn TextGenerator>;

/// Build the generator when text generation is enabled and a provider exists
pub fn create_generator(
    config: &ConnectorsConfig,
    provider: Option<SharedProvider>,
) -> Option<SharedGenerator> {
    match (config.text_generation, provider) {
        (true, Some(provider)) => Some(Arc::new(LlmSummaryGenerator::new(provider))),
        (true, None) => {
            warn!("Text generation enabled but no LLM provider is configured; using plain summaries");
            None
        }
        (false, _) => None,
    }
}

pub struct LlmSummaryGenerator {
    provider: SharedProvider,
}

impl LlmSummaryGenerator {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TextGenerator for LlmSummaryGenerator {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn executive_summary(
        &self,
        plan: &ResearchPlan,
        analysis: &AnalysisResult,
    ) -> Result<String> {
        let response = self
            .provider
            .generate(&summary_prompt(plan, analysis), &summary_schema())
            .await?;
        debug!("Executive summary usage: {}", response.usage_summary());

        json_string(&response.content, "executive_summary")
            .map(|s| collapse_whitespace(&s))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ResearchError::LlmApi("response did not include an executive summary".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::testing::MockProvider;
    use crate::research::planner::analyze_query;
    use serde_json::json;

    fn analysis() -> AnalysisResult {
        AnalysisResult::new(vec!["A".into()], vec!["t".into()], 0.5, "s")
    }

    #[tokio::test]
    async fn test_summary_from_provider() {
        let provider = MockProvider::replying(json!({"executive_summary": "  Two\nlines. "}));
        let generator = LlmSummaryGenerator::new(provider.shared());
        let plan = analyze_query("ai").unwrap();

        let summary = generator.executive_summary(&plan, &analysis()).await.unwrap();
        assert_eq!(summary, "Two lines.");
    }

    #[tokio::test]
    async fn test_blank_summary_is_error() {
        let provider = MockProvider::replying(json!({"executive_summary": "   "}));
        let generator = LlmSummaryGenerator::new(provider.shared());
        let plan = analyze_query("ai").unwrap();
        assert!(generator.executive_summary(&plan, &analysis()).await.is_err());
    }

    #[test]
    fn test_create_generator() {
        let mut config = ConnectorsConfig::default();
        let provider = MockProvider::replying(json!({})).shared();
        assert!(create_generator(&config, Some(provider.clone())).is_none());

        config.text_generation = true;
        assert!(create_generator(&config, None).is_none());
        assert!(create_generator(&config, Some(provider)).is_some());
    }
}
