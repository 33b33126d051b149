//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/bakerstreet/config.toml)
//! 3. Project config (.bakerstreet/config.toml)
//! 4. Explicit config file (`--config`)
//! 5. Environment variables (BAKERSTREET_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::constants::app::ENV_PREFIX;
use crate::types::{ResearchError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain:
    /// defaults → global → project → explicit file → env vars
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let config: Config = Self::figment(explicit)?
            .extract()
            .map_err(|e| ResearchError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Build the merged figment without extracting it
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ResearchError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // e.g. BAKERSTREET_LLM__MODEL -> llm.model
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(figment)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/bakerstreet/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
            .map(|p| p.join("bakerstreet"))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(".bakerstreet")
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| ResearchError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default config file to the global or project location
    pub fn init(global: bool, force: bool) -> Result<PathBuf> {
        let config_path = if global {
            Self::global_config_path().ok_or_else(|| {
                ResearchError::Config("Cannot determine global config directory".to_string())
            })?
        } else {
            Self::project_config_path()
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if config_path.exists() && !force {
            info!("Config exists: {}", config_path.display());
            return Ok(config_path);
        }

        fs::write(&config_path, Self::default_config_file())?;
        info!("Created config: {}", config_path.display());
        Ok(config_path)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_config_file() -> String {
        r#"# Baker Street Laboratory Configuration
# Environment overrides use BAKERSTREET_<SECTION>__<KEY>, e.g. BAKERSTREET_LLM__MODEL

version = "1.0"

[llm]
provider = "ollama"          # ollama | openai | none
model = "llama3.2:latest"
timeout_secs = 120
temperature = 0.3

[connectors]
collector = "none"           # none | web
sources = ["wikipedia", "arxiv", "news"]
max_results = 10
fanout_policy = "best_effort" # best_effort | fail_fast
analyzer = "extractive"      # extractive | llm
text_generation = false

[research]
output_dir = "research"
agents_file = "config/agents.yaml"
featured_topic = "meaning of life"

[storage]
enabled = true
database_path = ".bakerstreet/sessions.db"

[server]
host = "127.0.0.1"
port = 5000
"#
        .to_string()
    }
}
