//! Ollama Local LLM Provider
//!
//! LLM provider for locally-running Ollama models (`/api/generate` with
//! `format: json`, availability through `/api/tags`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{LlmProvider, LlmResponse, TokenUsage, prompt_utils};
use crate::ai::json::extract_json_from_response;
use crate::config::LlmConfig;
use crate::constants::llm::DEFAULT_OLLAMA_BASE;
use crate::types::{ErrorClassifier, ResearchError, Result};

pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_base = config.api_base.as_deref().unwrap_or(DEFAULT_OLLAMA_BASE);
        let api_base = Self::validate_endpoint(api_base)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ResearchError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Only http/https endpoints are accepted; non-local hosts are logged.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            ResearchError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ResearchError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Ensure this is intentional.",
                host
            );
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn build_request(&self, prompt: &str, schema: &Value) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            system: prompt_utils::RESEARCH_SYSTEM_PROMPT,
            prompt: prompt_utils::build_schema_prompt(prompt, schema),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
            format: "json",
        }
    }

    /// `llama3.2` and `llama3.2:latest` name the same model; other tags do not
    fn model_matches(&self, name: &str) -> bool {
        fn base(model: &str) -> &str {
            model.strip_suffix(":latest").unwrap_or(model)
        }
        base(name) == base(&self.model)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        info!(
            "Generating with Ollama (model: {}, temperature: {})",
            self.model, self.temperature
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt, schema);
        let url = format!("{}/api/generate", self.api_base);

        let response = self.client.post(&url).json(&request).send().await.map_err(|e| {
            if e.is_connect() {
                ResearchError::LlmApi(format!(
                    "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                    self.api_base
                ))
            } else {
                ErrorClassifier::classify_transport(&e, "ollama").into()
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Ollama API error ({}): {}", status, body),
                "ollama",
            )
            .into());
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::LlmApi(format!("Failed to parse Ollama response: {}", e)))?;

        debug!("Received response from Ollama, parsing JSON");
        let content = extract_json_from_response(&body.response)?;

        Ok(LlmResponse {
            content,
            usage: TokenUsage {
                input_tokens: body.prompt_eval_count.unwrap_or(0),
                output_tokens: body.eval_count.unwrap_or(0),
            },
            elapsed: start_time.elapsed(),
            model: self.model.clone(),
            provider: "ollama".to_string(),
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<OllamaTagsResponse>().await {
                Ok(tags) if tags.models.iter().any(|m| self.model_matches(&m.name)) => {
                    info!("Ollama is available with model: {}", self.model);
                    Ok(true)
                }
                Ok(_) => {
                    warn!(
                        "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                        self.model, self.model
                    );
                    Ok(false)
                }
                Err(_) => Ok(true),
            },
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    system: &'static str,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let provider = OllamaProvider::new(&LlmConfig::default()).unwrap();
        assert_eq!(provider.api_base, DEFAULT_OLLAMA_BASE);
        assert_eq!(provider.model, "llama3.2:latest");
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let config = LlmConfig {
            api_base: Some("file:///etc/passwd".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            OllamaProvider::new(&config),
            Err(ResearchError::Config(_))
        ));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = LlmConfig {
            api_base: Some("http://gpu-box:11434/".to_string()),
            ..Default::default()
        };
        let provider = OllamaProvider::new(&config).unwrap();
        assert_eq!(provider.api_base, "http://gpu-box:11434");
    }

    #[test]
    fn test_model_matching_ignores_latest_tag() {
        let provider = OllamaProvider::new(&LlmConfig::default()).unwrap();
        assert!(provider.model_matches("llama3.2:latest"));
        assert!(provider.model_matches("llama3.2"));
        assert!(!provider.model_matches("llama3.2:3b"));
        assert!(!provider.model_matches("mistral:7b"));
    }

    #[test]
    fn test_untagged_model_does_not_match_other_tags() {
        let config = LlmConfig {
            model: "llama3".to_string(),
            ..Default::default()
        };
        let provider = OllamaProvider::new(&config).unwrap();
        assert!(provider.model_matches("llama3:latest"));
        assert!(!provider.model_matches("llama3.1:8b"));
        assert!(!provider.model_matches("llama3:70b"));
    }

    #[test]
    fn test_request_asks_for_json() {
        let provider = OllamaProvider::new(&LlmConfig::default()).unwrap();
        let request = provider.build_request("hello", &Value::Null);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert_eq!(json["prompt"], "hello");
    }
}
