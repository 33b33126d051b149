//! Baker Street Laboratory - Research Automation Pipeline
//!
//! Turns a free-text research question into a timestamped markdown report
//! through a fixed sequence of phases: plan, collect, analyze, report.
//!
//! ## Core Features
//!
//! - **Session Lifecycle**: every run is a session that ends `completed` or `failed`
//! - **Pluggable Connectors**: data collection, analysis and text generation behind traits
//! - **Session Store**: optional SQLite history of sessions, phases and outputs
//! - **Two Front-ends**: a CLI and an axum HTTP API share one [`PipelineRunner`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use bakerstreet::{ConfigLoader, PipelineRunner};
//!
//! let config = ConfigLoader::load(None)?;
//! let (runner, _provider) = PipelineRunner::bootstrap(&config)?;
//! let envelope = runner.conduct("graph databases", "research/output".as_ref()).await?;
//! println!("{}", envelope.summary);
//! ```
//!
//! ## Modules
//!
//! - [`research`]: planning, collection, analysis, report writing and the runner
//! - [`ai`]: LLM provider abstraction, prompts and timeouts
//! - [`storage`]: SQLite session store with connection pooling
//! - [`config`]: layered configuration and the agent registry
//! - [`api`]: HTTP front-end
//! - [`cli`]: command implementations for the binary

pub mod ai;
pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod research;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{AgentRegistry, Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, Result, ResultExt, ResearchError};
pub use types::SessionId;

// Storage
pub use storage::database::PoolConfig;
pub use storage::{Database, SharedDatabase};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use research::{
    AnalysisResult, CollectedData, PipelineRunner, ReportArtifact, ResearchPlan, ResearchSession,
    ResultEnvelope, SessionManager, SessionStatus,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{LlmProvider, LlmResponse, SharedProvider, with_timeout};
