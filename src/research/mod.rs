//! Research session pipeline
//!
//! - [`planner`]: query → plan (pure)
//! - [`collector`] and [`sources`]: plan → collected data
//! - [`analyzer`]: collected data → findings, themes, confidence
//! - [`generator`]: optional LLM executive summary
//! - [`report`]: analysis → Markdown artifact on disk
//! - [`session`]: session lifecycle and store mirroring
//! - [`pipeline`]: runs the four phases in order

pub mod analyzer;
pub mod collector;
pub mod generator;
pub mod pipeline;
pub mod planner;
pub mod report;
pub mod session;
pub mod sources;
pub mod types;

pub use analyzer::{Analyzer, ExtractiveAnalyzer, LlmAnalyzer, SharedAnalyzer};
pub use collector::{DataCollector, NullCollector, SharedCollector, WebCollector};
pub use generator::{LlmSummaryGenerator, SharedGenerator, TextGenerator};
pub use pipeline::{PhaseTimeouts, PipelineRunner, RunnerStatus};
pub use planner::analyze_query;
pub use report::{ReportDocument, ReportEntry, ReportWriter, list_reports, read_report};
pub use session::SessionManager;
pub use sources::{DataSource, SharedSource};
pub use types::{
    AnalysisResult, CollectedData, ReportArtifact, ReportTemplate, ResearchCategory,
    ResearchPlan, ResearchSession, ResultEnvelope, SessionStatus, SourceItem,
};
