//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/bakerstreet/config.toml)
//! 3. Project config (.bakerstreet/config.toml)
//! 4. Explicit `--config` file
//! 5. Environment variables (BAKERSTREET_*)
//!
//! The agent registry (`config/agents.yaml`) is loaded separately by
//! [`AgentRegistry`]; only its agent and tool counts are used.

mod agents;
mod loader;
mod types;

pub use agents::{AgentProfile, AgentRegistry, ToolEntry};
pub use loader::ConfigLoader;
pub use types::*;
