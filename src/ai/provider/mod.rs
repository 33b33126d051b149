//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for structured LLM output generation.
//! Research connectors (LLM analyzer, summary generator) and the health
//! endpoint only ever see a [`SharedProvider`].

mod ollama;
mod openai;
mod prompt_utils;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use prompt_utils::build_schema_prompt;

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LlmConfig, ProviderKind};
use crate::types::Result;

// =============================================================================
// LLM Response
// =============================================================================

/// LLM response with parsed JSON content and usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated content (structured JSON)
    pub content: Value,
    pub usage: TokenUsage,
    /// Wall clock time of the request
    pub elapsed: Duration,
    pub model: String,
    pub provider: String,
}

impl LlmResponse {
    /// One-line usage description for debug logs
    pub fn usage_summary(&self) -> String {
        format!(
            "{}/{}: {} tokens ({} in, {} out) in {:.2}s",
            self.provider,
            self.model,
            self.usage.total(),
            self.usage.input_tokens,
            self.usage.output_tokens,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Shared LLM provider type for concurrent access across sessions.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

/// Outcome of a provider health probe
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub model: String,
    pub available: bool,
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate structured output guided by a JSON schema (`Value::Null` for none)
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is reachable and the model is available
    async fn health_check(&self) -> Result<bool>;
}

/// Probe a provider, folding errors into `available: false`
pub async fn probe(provider: &SharedProvider) -> ProviderHealth {
    let available = provider.health_check().await.unwrap_or(false);
    ProviderHealth {
        provider: provider.name().to_string(),
        model: provider.model().to_string(),
        available,
    }
}

/// Create a shared provider from configuration; `None` when the provider is disabled
pub fn create_provider(config: &LlmConfig) -> Result<Option<SharedProvider>> {
    match config.provider {
        ProviderKind::Ollama => Ok(Some(Arc::new(OllamaProvider::new(config)?))),
        ProviderKind::OpenAi => Ok(Some(Arc::new(OpenAiProvider::new(config)?))),
        ProviderKind::None => Ok(None),
    }
}
