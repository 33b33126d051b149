//! AI Integration Layer
//!
//! LLM providers, prompt construction, JSON extraction from model output,
//! and the timeout wrapper used around every connector call.

pub mod json;
pub mod prompt;
pub mod provider;
pub mod timeout;

pub use json::extract_json_from_response;
pub use prompt::PromptBuilder;
pub use provider::{
    ErrorCategory, ErrorClassifier, LlmError, LlmProvider, LlmResponse, ProviderHealth,
    SharedProvider, TokenUsage, create_provider, probe,
};
pub use timeout::with_timeout;
