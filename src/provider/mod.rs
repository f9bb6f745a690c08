// Pluggable AI translation providers
//
// One implementation per backend family behind a single capability trait.
// Providers own prompt construction, output length validation, and bounded
// repair retries; dispatch is static registration by name through the
// factory.

pub mod anthropic;
pub mod common;
pub mod gemini;
pub mod openai;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::FieldSpec;
use crate::config::TranslateConfig;
use crate::error::{LocflowError, Result};

/// One translation unit, constructed per (locale x field) pair and consumed
/// exactly once.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub text: String,
    pub locale: String,
    pub field: &'static FieldSpec,
    /// Session seed forwarded to backends that support deterministic
    /// generation.
    pub seed: u64,
    pub refinement: Option<String>,
}

/// Outcome of one translation request.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationResult {
    Success { text: String, char_count: usize },
    Failure { reason: FailureReason },
}

impl TranslationResult {
    pub fn success(text: String) -> Self {
        let char_count = text.chars().count();
        Self::Success { text, char_count }
    }

    pub fn failure(reason: FailureReason) -> Self {
        Self::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// Output still exceeded the field limit after all repair attempts. The
    /// deterministic salvage truncation is carried so callers can decide
    /// whether to use it, but it is never reported as a clean success.
    LimitExceeded {
        limit: usize,
        char_count: usize,
        truncated: String,
    },
    Timeout,
    EmptyOutput,
    Backend(String),
    /// The run was cancelled before this locale was dispatched.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitExceeded { limit, char_count, .. } => {
                write!(f, "output was {} characters, limit is {}", char_count, limit)
            }
            Self::Timeout => write!(f, "generation request timed out"),
            Self::EmptyOutput => write!(f, "backend returned empty output"),
            Self::Backend(message) => write!(f, "backend error: {}", message),
            Self::Cancelled => write!(f, "cancelled before dispatch"),
        }
    }
}

/// Capability contract implemented by every AI backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate one request, honoring the field's character limit.
    ///
    /// Implementations must validate-and-repair within their own bounded
    /// retry budget; failures are data, not errors.
    async fn translate(&self, request: &TranslationRequest) -> TranslationResult;

    fn name(&self) -> &str;
}

/// Known provider families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "anthropic" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAi),
            "google" | "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }
}

/// Factory for creating provider instances by configured name.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &TranslateConfig) -> Result<Arc<dyn TranslationProvider>> {
        let kind = ProviderKind::from_name(&config.provider).ok_or_else(|| {
            LocflowError::Config(format!("Unknown AI provider: {}", config.provider))
        })?;

        Ok(match kind {
            ProviderKind::Anthropic => Arc::new(anthropic::AnthropicProvider::new(config)?),
            ProviderKind::OpenAi => Arc::new(openai::OpenAiProvider::new(config)?),
            ProviderKind::Gemini => Arc::new(gemini::GeminiProvider::new(config)?),
        })
    }
}
