//! Agent Registry
//!
//! Reads the YAML agent registry (`agents:` and `tools:` maps). The pipeline
//! only reports how many agents and tools are configured; per-agent model
//! parameters are kept for `status` output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::types::Result;

/// One configured agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    #[serde(rename = "type", default)]
    pub agent_type: String,
    #[serde(default = "default_agent_model")]
    pub model: String,
    #[serde(default = "default_agent_temperature")]
    pub temperature: f32,
    #[serde(default = "default_agent_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
}

fn default_agent_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_agent_temperature() -> f32 {
    0.3
}

fn default_agent_max_tokens() -> u32 {
    2000
}

/// External tool entry; the category comes from the enclosing `tools:` key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRegistry {
    #[serde(default)]
    pub agents: BTreeMap<String, AgentProfile>,
    #[serde(default)]
    pub tools: BTreeMap<String, Vec<ToolEntry>>,
}

impl AgentRegistry {
    /// Parse a registry from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load the registry, returning an empty one when the file is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Agent registry not found at {}; continuing with no agents",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_yaml(&content)?;
        debug!(
            "Loaded {} agents and {} tools from {}",
            registry.agent_count(),
            registry.tool_count(),
            path.display()
        );
        Ok(registry)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Named tools across all categories
    pub fn tool_count(&self) -> usize {
        self.tools
            .values()
            .flatten()
            .filter(|t| !t.name.is_empty())
            .count()
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }
}
