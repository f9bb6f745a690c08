use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TranslateConfig;
use crate::error::{LocflowError, Result};

use super::common::{map_generation_error, translate_with_repair, GenerationBackend};
use super::{TranslationProvider, TranslationRequest, TranslationResult};

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude translation provider.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_repair_retries: u32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

impl AnthropicProvider {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let api_key = config.resolve_api_key("ANTHROPIC_API_KEY")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            max_repair_retries: config.max_repair_retries,
        })
    }
}

#[async_trait]
impl GenerationBackend for AnthropicProvider {
    // The messages API has no seed parameter, so determinism degrades
    // gracefully here.
    async fn generate(&self, system: &str, text: &str, _seed: u64) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            system,
            max_tokens: 1000,
            messages: vec![Message {
                role: "user",
                content: text,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_generation_error(e, "anthropic generation"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LocflowError::Translation(format!(
                "Anthropic API error {}: {}",
                status, body
            )));
        }

        let envelope: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LocflowError::Translation(format!("Failed to parse response: {}", e)))?;

        envelope
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| LocflowError::Translation("Unexpected API response format".to_string()))
    }
}

#[async_trait]
impl TranslationProvider for AnthropicProvider {
    async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        translate_with_repair(self, self.name(), request, self.max_repair_retries).await
    }

    fn name(&self) -> &str {
        "Anthropic Claude"
    }
}
