//! Analysis (phase 3)
//!
//! Given a plan and collected data, produce findings, themes and a
//! confidence score. The extractive analyzer works offline; the LLM
//! analyzer asks the configured provider for a schema-shaped answer.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{AnalysisResult, CollectedData, ResearchPlan};
use crate::ai::prompt::{analysis_prompt, analysis_schema};
use crate::ai::provider::SharedProvider;
use crate::config::{AnalyzerKind, ConnectorsConfig};
use crate::types::utils::{json_f64, json_string, json_string_array};
use crate::types::{ResearchError, Result};

/// Upper bound on findings taken from collected items
const MAX_FINDINGS: usize = 10;

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, data: &CollectedData, plan: &ResearchPlan) -> Result<AnalysisResult>;
}

pub type SharedAnalyzer = Arc<dyn Analyzer>;

pub fn create_analyzer(
    config: &ConnectorsConfig,
    provider: Option<SharedProvider>,
) -> Result<SharedAnalyzer> {
    match (config.analyzer, provider) {
        (AnalyzerKind::Extractive, _) => Ok(Arc::new(ExtractiveAnalyzer)),
        (AnalyzerKind::Llm, Some(provider)) => Ok(Arc::new(LlmAnalyzer::new(provider))),
        (AnalyzerKind::Llm, None) => Err(ResearchError::Config(
            "LLM analyzer requires an LLM provider".to_string(),
        )),
    }
}

// =============================================================================
// Extractive
// =============================================================================

/// Offline analyzer.
///
/// Findings come from item titles and snippets, themes from the plan, and
/// confidence is the collection quality score. Nothing is invented when
/// no material was collected.
pub struct ExtractiveAnalyzer;

#[async_trait]
impl Analyzer for ExtractiveAnalyzer {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn analyze(&self, data: &CollectedData, plan: &ResearchPlan) -> Result<AnalysisResult> {
        let themes = themes_from_plan(plan);

        if data.is_empty() {
            let findings = vec![
                format!("The query was classified as {} research", plan.category),
                format!("Key concepts identified: {}", plan.key_concepts.join(", ")),
                "No source material was collected, so these findings rest on query analysis alone"
                    .to_string(),
            ];
            let summary = format!(
                "No source material was available for \"{}\". The plan suggests {} search strategies across {} expected source types.",
                plan.query,
                plan.search_strategies.len(),
                plan.expected_sources.len()
            );
            return Ok(AnalysisResult::new(findings, themes, 0.0, summary));
        }

        let findings: Vec<String> = data
            .items
            .iter()
            .take(MAX_FINDINGS)
            .map(|item| match first_sentence(&item.snippet) {
                Some(sentence) => format!("{} ({}): {}", item.title, item.source, sentence),
                None => format!("{} ({})", item.title, item.source),
            })
            .collect();

        let productive: Vec<&str> = data
            .sources_by_category
            .keys()
            .map(String::as_str)
            .collect();
        let summary = format!(
            "Analyzed {} items from {} of {} queried sources for \"{}\". Material covers: {}.",
            data.total_items(),
            data.sources_queried
                .iter()
                .filter(|s| data.items.iter().any(|i| &i.source == *s))
                .count(),
            data.sources_queried.len(),
            plan.query,
            productive.join(", ")
        );

        debug!("Extractive analysis produced {} findings", findings.len());
        Ok(AnalysisResult::new(
            findings,
            themes,
            data.quality_score,
            summary,
        ))
    }
}

fn themes_from_plan(plan: &ResearchPlan) -> Vec<String> {
    let mut themes: Vec<String> = plan
        .key_concepts
        .iter()
        .filter(|c| c.as_str() != "general")
        .cloned()
        .collect();
    let category = plan.category.as_str().to_string();
    if !themes.contains(&category) {
        themes.push(category);
    }
    themes
}

fn first_sentence(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let end = text
        .find(". ")
        .map(|i| i + 1)
        .unwrap_or(text.len());
    Some(text[..end].to_string())
}

// =============================================================================
// LLM
// =============================================================================

pub struct LlmAnalyzer {
    provider: SharedProvider,
}

impl LlmAnalyzer {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn analyze(&self, data: &CollectedData, plan: &ResearchPlan) -> Result<AnalysisResult> {
        let prompt = analysis_prompt(plan, data);
        let response = self
            .provider
            .generate(&prompt, &analysis_schema())
            .await
            .map_err(|e| {
                ResearchError::Analysis(format!("{} provider failed: {}", self.provider.name(), e))
            })?;

        let content = &response.content;
        let key_findings = json_string_array(content, "key_findings");
        if key_findings.is_empty() {
            return Err(ResearchError::Analysis(
                "LLM response contained no key findings".to_string(),
            ));
        }

        let themes = json_string_array(content, "themes");
        let confidence = json_f64(content, "confidence", 0.0);
        let summary = json_string(content, "analysis_summary").unwrap_or_default();

        debug!("LLM analysis usage: {}", response.usage_summary());
        info!(
            "LLM analysis via {} ({}): {} findings",
            response.provider,
            response.model,
            key_findings.len()
        );
        Ok(AnalysisResult::new(key_findings, themes, confidence, summary))
    }
}
