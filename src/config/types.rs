//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/bakerstreet/) and project (.bakerstreet/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants;
use crate::types::{ResearchError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Data collection, analysis and text generation connectors
    pub connectors: ConnectorsConfig,

    /// Research session and report settings
    pub research: ResearchConfig,

    /// Session store settings
    pub storage: StorageConfig,

    /// HTTP API settings
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            connectors: ConnectorsConfig::default(),
            research: ResearchConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ResearchError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ResearchError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ResearchError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        let c = &self.connectors;
        if c.collection_timeout_secs == 0
            || c.analysis_timeout_secs == 0
            || c.generation_timeout_secs == 0
        {
            return Err(ResearchError::Config(
                "Connector timeouts must be greater than 0".to_string(),
            ));
        }

        if c.max_concurrent_sources == 0 {
            return Err(ResearchError::Config(
                "connectors.max_concurrent_sources must be greater than 0".to_string(),
            ));
        }

        if c.collector == CollectorKind::Web && c.sources.is_empty() {
            return Err(ResearchError::Config(
                "connectors.sources must not be empty when collector = \"web\"".to_string(),
            ));
        }

        if c.analyzer == AnalyzerKind::Llm && self.llm.provider == ProviderKind::None {
            return Err(ResearchError::Config(
                "analyzer = \"llm\" requires an LLM provider (llm.provider)".to_string(),
            ));
        }

        if self.research.featured_topic.trim().is_empty() {
            return Err(ResearchError::Config(
                "research.featured_topic must not be empty".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ResearchError::Config(
                "server.port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAi,
    None,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::None => write!(f, "none"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai" or "none"
    pub provider: ProviderKind,

    /// Model name
    pub model: String,

    /// API base URL (provider default when unset)
    pub api_base: Option<String>,

    /// API key, falls back to OPENAI_API_KEY. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for LLM generation
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            model: constants::llm::DEFAULT_OLLAMA_MODEL.to_string(),
            api_base: None,
            api_key: None,
            timeout_secs: 120,
            temperature: 0.3,
            max_tokens: 2048,
        }
    }
}

// =============================================================================
// Connector Configuration
// =============================================================================

/// Which data collector runs in phase 2
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollectorKind {
    /// No collector: phase 2 yields explicitly empty data
    #[default]
    None,
    /// Fan out over the configured web sources
    Web,
}

/// Which analyzer runs in phase 3
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    /// Deterministic analysis over collected items
    #[default]
    Extractive,
    /// LLM-backed analysis with a JSON schema
    Llm,
}

/// Web data sources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Wikipedia,
    Arxiv,
    News,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Wikipedia => "wikipedia",
            SourceKind::Arxiv => "arxiv",
            SourceKind::News => "news",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wikipedia" => Ok(SourceKind::Wikipedia),
            "arxiv" => Ok(SourceKind::Arxiv),
            "news" => Ok(SourceKind::News),
            _ => Err(format!(
                "Unknown data source: {}. Valid values: wikipedia, arxiv, news",
                s
            )),
        }
    }
}

/// How the web collector treats individual source failures
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FanoutPolicy {
    /// Skip failing sources; fail only when every source fails
    #[default]
    BestEffort,
    /// The first failing source fails the whole collection phase
    FailFast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorsConfig {
    pub collector: CollectorKind,

    /// Sources queried by the web collector
    pub sources: Vec<SourceKind>,

    /// Maximum results requested per source
    pub max_results: usize,

    /// Upper bound on concurrently running source requests
    pub max_concurrent_sources: usize,

    pub fanout_policy: FanoutPolicy,

    pub analyzer: AnalyzerKind,

    /// Use the LLM provider to write the executive summary
    pub text_generation: bool,

    pub collection_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
    pub generation_timeout_secs: u64,

    /// Environment variable holding the News API key
    pub news_api_key_env: String,
}

impl Default for ConnectorsConfig {
    fn default() -> Self {
        Self {
            collector: CollectorKind::None,
            sources: vec![SourceKind::Wikipedia, SourceKind::Arxiv, SourceKind::News],
            max_results: 10,
            max_concurrent_sources: 3,
            fanout_policy: FanoutPolicy::BestEffort,
            analyzer: AnalyzerKind::Extractive,
            text_generation: false,
            collection_timeout_secs: 60,
            analysis_timeout_secs: 180,
            generation_timeout_secs: 120,
            news_api_key_env: "NEWS_API_KEY".to_string(),
        }
    }
}

impl ConnectorsConfig {
    pub fn collection_timeout(&self) -> Duration {
        Duration::from_secs(self.collection_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

// =============================================================================
// Research Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Default output directory for reports
    pub output_dir: PathBuf,

    /// Agent registry (YAML)
    pub agents_file: PathBuf,

    /// Queries containing this phrase get the featured report template
    pub featured_topic: String,

    /// Overrides the built-in featured template
    pub featured_template: Option<PathBuf>,

    /// Query used by the `pipeline` command
    pub sample_query: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(constants::research::DEFAULT_OUTPUT_DIR),
            agents_file: PathBuf::from("config/agents.yaml"),
            featured_topic: constants::research::FEATURED_TOPIC.to_string(),
            featured_template: None,
            sample_query: constants::research::SAMPLE_QUERY.to_string(),
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Record sessions in SQLite
    pub enabled: bool,

    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: PathBuf::from(".bakerstreet/sessions.db"),
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Output directory used when a request does not name one
    pub api_output_dir: PathBuf,

    /// Root scanned by the report listing endpoints
    pub reports_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            api_output_dir: PathBuf::from("research/api_output"),
            reports_root: PathBuf::from(constants::research::DEFAULT_OUTPUT_DIR),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.connectors.collector, CollectorKind::None);
        assert_eq!(config.research.featured_topic, "meaning of life");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(matches!(config.validate(), Err(ResearchError::Config(_))));
    }

    #[test]
    fn test_validate_llm_analyzer_needs_provider() {
        let mut config = Config::default();
        config.connectors.analyzer = AnalyzerKind::Llm;
        config.llm.provider = ProviderKind::None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_web_collector_needs_sources() {
        let mut config = Config::default();
        config.connectors.collector = CollectorKind::Web;
        config.connectors.sources.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!("Wikipedia".parse::<SourceKind>(), Ok(SourceKind::Wikipedia));
        assert_eq!("arxiv".parse::<SourceKind>(), Ok(SourceKind::Arxiv));
        assert!("altavista".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(format!("{:?}", config.llm).contains("[REDACTED]"));
    }
}
