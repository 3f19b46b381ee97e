//! Narrative analysis through an LLM.
//!
//! The pipeline only relies on prompt-in/text-out. [`OllamaAnalyzer`] talks to
//! Ollama's chat API; tests and alternative backends implement
//! [`NarrativeAnalyzer`] directly.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Prompt-in/text-out analysis capability.
#[async_trait]
pub trait NarrativeAnalyzer: Send + Sync {
    /// Name of the model behind this analyzer, recorded in the trace.
    fn model_name(&self) -> &str;

    async fn analyze(&self, prompt: &str) -> Result<String>;
}

/// Configuration for the Ollama analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.7,
            timeout_seconds: 120,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

pub struct OllamaAnalyzer {
    config: AnalyzerConfig,
    http_client: reqwest::Client,
}

impl OllamaAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        info!(
            "Initializing analyzer with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn build_request(&self, prompt: &str) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        }
    }
}

#[async_trait]
impl NarrativeAnalyzer for OllamaAnalyzer {
    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    async fn analyze(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.config.ollama_url);
        let request = self.build_request(prompt);

        debug!("Sending {} byte prompt to {}", prompt.len(), url);

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    )
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(chat_response.message.content)
    }
}

const SYSTEM_PROMPT: &str = "You are a shopping assistant that helps analyze product search queries and compare and recommend products.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_config_default() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert_eq!(config.temperature, 0.7);
    }

    #[test]
    fn test_request_shape() {
        let analyzer = OllamaAnalyzer::new(AnalyzerConfig::default()).unwrap();
        let request = analyzer.build_request("compare these");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama3.2:latest");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "compare these");
        assert_eq!(analyzer.model_name(), "llama3.2:latest");
    }

    #[tokio::test]
    async fn test_unreachable_ollama_is_an_error() {
        let analyzer = OllamaAnalyzer::new(AnalyzerConfig {
            ollama_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            ..AnalyzerConfig::default()
        })
        .unwrap();

        assert!(analyzer.analyze("hello").await.is_err());
    }
}
