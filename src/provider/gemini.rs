use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TranslateConfig;
use crate::error::{LocflowError, Result};

use super::common::{map_generation_error, translate_with_repair, GenerationBackend};
use super::{TranslationProvider, TranslationRequest, TranslationResult};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1/models";

/// Google Gemini translation provider.
///
/// Gemini has no separate system role on this endpoint, so the instruction
/// and the source text are merged into a single prompt part.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_repair_retries: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    seed: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

impl GeminiProvider {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let api_key = config.resolve_api_key("GEMINI_API_KEY")?;
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
impl GenerationBackend for GeminiProvider {
    async fn generate(&self, system: &str, text: &str, seed: u64) -> Result<String> {
        let prompt = format!("{}\n\nText to translate: {}", system, text);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 8000,
                seed,
            },
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_generation_error(e, "gemini generation"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LocflowError::Translation(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let envelope: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LocflowError::Translation(format!("Failed to parse response: {}", e)))?;

        let candidate = envelope
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LocflowError::Translation("Unexpected API response format".to_string()))?;

        if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
            return Err(LocflowError::Translation(
                "Generation exceeded token limit".to_string(),
            ));
        }

        candidate
            .content
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| LocflowError::Translation("Unexpected API response format".to_string()))
    }
}

#[async_trait]
impl TranslationProvider for GeminiProvider {
    async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        translate_with_repair(self, self.name(), request, self.max_repair_retries).await
    }

    fn name(&self) -> &str {
        "Google Gemini"
    }
}
