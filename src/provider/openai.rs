use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TranslateConfig;
use crate::error::{LocflowError, Result};

use super::common::{map_generation_error, translate_with_repair, GenerationBackend};
use super::{TranslationProvider, TranslationRequest, TranslationResult};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI GPT translation provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_repair_retries: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    /// Deterministic sampling seed, honored best-effort by the API.
    seed: u64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenAiProvider {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let api_key = config.resolve_api_key("OPENAI_API_KEY")?;
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
impl GenerationBackend for OpenAiProvider {
    async fn generate(&self, system: &str, text: &str, seed: u64) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: 1000,
            temperature: 0.7,
            seed,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_generation_error(e, "openai generation"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LocflowError::Translation(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|e| LocflowError::Translation(format!("Failed to parse response: {}", e)))?;

        envelope
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LocflowError::Translation("Unexpected API response format".to_string()))
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        translate_with_repair(self, self.name(), request, self.max_repair_retries).await
    }

    fn name(&self) -> &str {
        "OpenAI GPT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_carries_seed_for_determinism() {
        let request = ChatRequest {
            model: "gpt-4.1",
            messages: vec![
                ChatMessage { role: "system", content: "translate" },
                ChatMessage { role: "user", content: "hello" },
            ],
            max_tokens: 1000,
            temperature: 0.7,
            seed: 12345,
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["seed"], 12345);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[test]
    fn chat_response_parses_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"translated"}}]}"#;
        let envelope: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.choices[0].message.content, "translated");
    }
}
