//! Research domain types
//!
//! Each pipeline phase produces one of these values and the next phase
//! consumes it: `ResearchPlan` → `CollectedData` → `AnalysisResult` →
//! `ReportArtifact`. Only [`ResultEnvelope`] crosses the external boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::SessionId;

// =============================================================================
// Session
// =============================================================================

/// Session lifecycle state; transitions only go forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown session status: {}", other)),
        }
    }
}

/// One research request, from acceptance to its terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSession {
    pub session_id: SessionId,
    pub query: String,
    pub status: SessionStatus,
    pub output_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ResearchSession {
    /// Path of the single report artifact this session may write
    pub fn report_path(&self) -> PathBuf {
        self.output_dir
            .join(crate::research::report::report_file_name(&self.session_id))
    }
}

// =============================================================================
// Phase 1: Plan
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchCategory {
    Philosophical,
    Technical,
    Historical,
    General,
}

impl ResearchCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Philosophical => "philosophical",
            Self::Technical => "technical",
            Self::Historical => "historical",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for ResearchCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub query: String,
    pub category: ResearchCategory,
    pub key_concepts: Vec<String>,
    pub search_strategies: Vec<String>,
    pub expected_sources: Vec<String>,
}

// =============================================================================
// Phase 2: Collected data
// =============================================================================

/// One piece of material returned by a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Source that produced the item (e.g. "wikipedia")
    pub source: String,
    /// Expected-source category it counts towards (e.g. "web", "academic")
    pub category: String,
    pub title: String,
    pub snippet: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectedData {
    pub items: Vec<SourceItem>,
    /// Sources that were asked, whether or not they answered
    pub sources_queried: Vec<String>,
    /// Items per source category
    pub sources_by_category: BTreeMap<String, usize>,
    /// Fraction of queried sources that returned at least one item
    pub quality_score: f64,
}

impl CollectedData {
    /// No collector configured: zero sources, zero quality
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from collected items, computing category counts and quality
    pub fn from_items(items: Vec<SourceItem>, sources_queried: Vec<String>) -> Self {
        let mut sources_by_category = BTreeMap::new();
        for item in &items {
            *sources_by_category.entry(item.category.clone()).or_insert(0) += 1;
        }

        let productive = sources_queried
            .iter()
            .filter(|s| items.iter().any(|i| &i.source == *s))
            .count();
        let quality_score = if sources_queried.is_empty() {
            0.0
        } else {
            productive as f64 / sources_queried.len() as f64
        };

        Self {
            items,
            sources_queried,
            sources_by_category,
            quality_score,
        }
    }

    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Phase 3: Analysis
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub key_findings: Vec<String>,
    pub themes: Vec<String>,
    /// Always within [0, 1]
    pub confidence: f64,
    pub summary: String,
}

impl AnalysisResult {
    pub fn new(
        key_findings: Vec<String>,
        themes: Vec<String>,
        confidence: f64,
        summary: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            key_findings,
            themes,
            confidence,
            summary: summary.into(),
        }
    }
}

// =============================================================================
// Phase 4: Report
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTemplate {
    Featured,
    Generic,
}

impl ReportTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub path: PathBuf,
    #[serde(skip)]
    pub content: String,
    pub word_count: usize,
    pub section_count: usize,
    pub size_bytes: u64,
    pub template: ReportTemplate,
    /// Hex SHA-256 of the written content
    pub content_hash: String,
}

// =============================================================================
// Envelope
// =============================================================================

/// Final outcome of a session as seen by CLI and HTTP callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub session_id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub output_dir: String,
    pub status: SessionStatus,
    pub summary: String,
    pub report_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultEnvelope {
    pub fn completed(session: &ResearchSession, report: &ReportArtifact, summary: String) -> Self {
        Self {
            session_id: session.session_id.to_string(),
            query: session.query.clone(),
            timestamp: Utc::now(),
            output_dir: session.output_dir.display().to_string(),
            status: SessionStatus::Completed,
            summary,
            report_path: Some(report.path.display().to_string()),
            error: None,
        }
    }

    pub fn failed(session: &ResearchSession, error: &str) -> Self {
        Self {
            session_id: session.session_id.to_string(),
            query: session.query.clone(),
            timestamp: Utc::now(),
            output_dir: session.output_dir.display().to_string(),
            status: SessionStatus::Failed,
            summary: "Research failed".to_string(),
            report_path: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}
