//! Report Writer (phase 4)
//!
//! Renders an analysis into Markdown, writes it atomically as
//! `research_report_<session_id>.md`, and reads reports back for the
//! listing endpoints.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::types::{AnalysisResult, ReportArtifact, ReportTemplate};
use crate::config::ResearchConfig;
use crate::constants::{app, research};
use crate::types::utils::log_filter_warn;
use crate::types::{ResearchError, Result, SessionId};

const FEATURED_TEMPLATE: &str = include_str!("templates/featured.md");

/// `research_report_<session_id>.md`
pub fn report_file_name(session_id: &SessionId) -> String {
    format!(
        "{}{}.{}",
        research::REPORT_PREFIX,
        session_id,
        research::REPORT_EXTENSION
    )
}

pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

/// Number of level-2 headings
pub fn section_count(content: &str) -> usize {
    content.lines().filter(|l| l.starts_with("## ")).count()
}

fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone)]
pub struct ReportWriter {
    featured_topic: String,
    featured_template: String,
}

impl ReportWriter {
    pub fn new(featured_topic: impl Into<String>) -> Self {
        Self {
            featured_topic: featured_topic.into(),
            featured_template: FEATURED_TEMPLATE.to_string(),
        }
    }

    /// Build from config, loading a featured template override if one is set
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let mut writer = Self::new(config.featured_topic.clone());
        if let Some(path) = &config.featured_template {
            writer.featured_template = std::fs::read_to_string(path).map_err(|e| {
                ResearchError::Config(format!(
                    "Failed to read featured template {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(writer)
    }

    pub fn select_template(&self, query: &str) -> ReportTemplate {
        if query
            .to_lowercase()
            .contains(&self.featured_topic.to_lowercase())
        {
            ReportTemplate::Featured
        } else {
            ReportTemplate::Generic
        }
    }

    /// Render report content; `executive_summary` replaces the default
    /// opening sentence of the generic template.
    pub fn render(
        &self,
        query: &str,
        analysis: &AnalysisResult,
        session_id: &SessionId,
        executive_summary: Option<&str>,
    ) -> (ReportTemplate, String) {
        let date = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let confidence = format!("{:.2}", analysis.confidence);

        match self.select_template(query) {
            ReportTemplate::Featured => {
                let content = self
                    .featured_template
                    .replace("{session_id}", session_id.as_str())
                    .replace("{date}", &date)
                    .replace("{confidence}", &confidence);
                (ReportTemplate::Featured, content)
            }
            ReportTemplate::Generic => {
                let content =
                    render_generic(query, analysis, session_id, &date, &confidence, executive_summary);
                (ReportTemplate::Generic, content)
            }
        }
    }

    /// Render and persist the single report artifact for a session
    pub async fn generate_report(
        &self,
        query: &str,
        analysis: &AnalysisResult,
        output_dir: &Path,
        session_id: &SessionId,
        executive_summary: Option<&str>,
    ) -> Result<ReportArtifact> {
        let (template, content) = self.render(query, analysis, session_id, executive_summary);
        let path = output_dir.join(report_file_name(session_id));

        write_atomic(&path, &content).await?;

        let artifact = ReportArtifact {
            word_count: word_count(&content),
            section_count: section_count(&content),
            size_bytes: content.len() as u64,
            content_hash: content_hash(&content),
            template,
            path,
            content,
        };
        info!(
            "Report written: {} ({} words, {} sections, {} template)",
            artifact.path.display(),
            artifact.word_count,
            artifact.section_count,
            template.as_str()
        );
        Ok(artifact)
    }
}

fn render_generic(
    query: &str,
    analysis: &AnalysisResult,
    session_id: &SessionId,
    date: &str,
    confidence: &str,
    executive_summary: Option<&str>,
) -> String {
    let summary = executive_summary
        .map(str::to_string)
        .unwrap_or_else(|| format!("This report presents research findings on: {}", query));

    let findings = if analysis.key_findings.is_empty() {
        "- No key findings were produced".to_string()
    } else {
        analysis
            .key_findings
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let analysis_summary = if analysis.summary.trim().is_empty() {
        "No analysis summary was produced."
    } else {
        analysis.summary.as_str()
    };

    let themes = if analysis.themes.is_empty() {
        "None identified".to_string()
    } else {
        analysis.themes.join(", ")
    };

    format!(
        "# Research Report: {query}\n\n\
         **Session ID:** {session_id}\n\
         **Date:** {date}\n\
         **Generated by:** {generator}\n\n\
         ## Executive Summary\n\n{summary}\n\n\
         ## Key Findings\n\n{findings}\n\n\
         ## Analysis Summary\n\n{analysis_summary}\n\n\
         ## Themes Identified\n\n{themes}\n\n\
         ## Confidence Score\n\nResearch confidence: {confidence}/1.0\n\n\
         ---\n\n\
         *This report was generated by the Baker Street Laboratory research pipeline.*\n",
        generator = app::PIPELINE_NAME,
    )
}

/// Write via a temporary sibling and rename into place.
pub async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ResearchError::Storage(format!("Invalid report path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let result: std::io::Result<()> = async {
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(ResearchError::Storage(format!(
            "Failed to write {}: {}",
            path.display(),
            e
        )));
    }
    debug!("Atomically wrote {}", path.display());
    Ok(())
}

// =============================================================================
// Listing
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub filename: String,
    pub report_id: String,
    pub path: PathBuf,
    pub size: u64,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub report_id: String,
    pub content: String,
    pub path: PathBuf,
    pub size: u64,
    pub word_count: usize,
}

fn report_glob(root: &Path, id: &str) -> String {
    let root = glob::Pattern::escape(&root.display().to_string());
    format!(
        "{}/**/{}{}.{}",
        root,
        research::REPORT_PREFIX,
        id,
        research::REPORT_EXTENSION
    )
}

fn entry_for(path: PathBuf) -> Option<ReportEntry> {
    let filename = path.file_name()?.to_str()?.to_string();
    let report_id = filename
        .strip_prefix(research::REPORT_PREFIX)?
        .strip_suffix(&format!(".{}", research::REPORT_EXTENSION))?
        .to_string();
    let meta = std::fs::metadata(&path).ok()?;
    let created = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_default();
    Some(ReportEntry {
        filename,
        report_id,
        path,
        size: meta.len(),
        created,
    })
}

/// All reports under `root`, newest first. A missing root yields nothing.
pub fn list_reports(root: &Path) -> Result<Vec<ReportEntry>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let paths = glob::glob(&report_glob(root, "*"))
        .map_err(|e| ResearchError::Storage(format!("Invalid report pattern: {}", e)))?;

    let mut reports: Vec<ReportEntry> = paths
        .filter_map(|p| log_filter_warn(p, "Skipping unreadable report path"))
        .filter_map(entry_for)
        .collect();
    reports.sort_by(|a, b| b.created.cmp(&a.created).then(a.filename.cmp(&b.filename)));
    Ok(reports)
}

/// Read a report by id from anywhere under `root`.
pub fn read_report(root: &Path, report_id: &str) -> Result<ReportDocument> {
    if !SessionId::is_valid(report_id) {
        return Err(ResearchError::NotFound(format!("report {}", report_id)));
    }

    let path = glob::glob(&report_glob(root, report_id))
        .map_err(|e| ResearchError::Storage(format!("Invalid report pattern: {}", e)))?
        .filter_map(|p| p.ok())
        .next()
        .ok_or_else(|| ResearchError::NotFound(format!("report {}", report_id)))?;

    let content = std::fs::read_to_string(&path).map_err(|e| {
        ResearchError::Storage(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(ReportDocument {
        report_id: report_id.to_string(),
        size: content.len() as u64,
        word_count: word_count(&content),
        path,
        content,
    })
}
