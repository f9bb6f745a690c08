use async_trait::async_trait;
use tracing::{debug, warn};

use crate::catalog;
use crate::error::{LocflowError, Result};

use super::{FailureReason, TranslationRequest, TranslationResult};

/// Raw generation seam implemented by each backend family. The shared repair
/// loop drives this; backends only know how to turn a prompt pair into text.
#[async_trait]
pub(crate) trait GenerationBackend: Send + Sync {
    async fn generate(&self, system: &str, text: &str, seed: u64) -> Result<String>;
}

/// Classify a backend HTTP failure: timeouts are their own failure class,
/// everything else propagates as a transport error.
pub(crate) fn map_generation_error(e: reqwest::Error, what: &str) -> LocflowError {
    if e.is_timeout() {
        LocflowError::Timeout(what.to_string())
    } else {
        LocflowError::Http(e)
    }
}

/// Build the system instruction for one generation attempt.
///
/// `stricter` carries the repair instruction from a previous over-limit or
/// empty attempt.
pub(crate) fn build_system_message(
    request: &TranslationRequest,
    language_name: &str,
    stricter: Option<&str>,
) -> String {
    let mut system = format!(
        "You are a professional translator specializing in app store metadata translation. \
         Translate the following text to {} (locale code: {}). \
         Maintain the marketing tone and style of the original text. \
         Return ONLY the translated text (no quotes, no labels, no markdown, no explanations). \
         Keep app/product names, brand names, URLs, numbers, and placeholders unchanged.",
        language_name, request.locale
    );

    if request.field.is_keywords {
        system.push_str(
            " For keywords, provide a comma-separated list with no spaces around commas \
             and keep it concise.",
        );
    }

    system.push_str(&format!(
        " CRITICAL: Your translation MUST be {} characters or fewer. \
         Do not add ellipsis (...) at the end. Create a concise but meaningful \
         translation that captures the essence of the original message while \
         staying within the character limit.",
        request.field.max_chars
    ));

    if let Some(refinement) = request.refinement.as_deref() {
        if !refinement.trim().is_empty() {
            system.push(' ');
            system.push_str(refinement.trim());
        }
    }

    if let Some(stricter) = stricter {
        system.push(' ');
        system.push_str(stricter);
    }

    system
}

/// Run one translation with bounded validate-and-repair retries.
///
/// Attempts are strictly sequential. A timeout or backend error aborts the
/// call as its own failure class and never consumes repair attempts. If the
/// output still exceeds the limit after all attempts, a deterministic
/// truncation is produced but reported as a limit failure, never as success.
pub(crate) async fn translate_with_repair(
    backend: &dyn GenerationBackend,
    provider_name: &str,
    request: &TranslationRequest,
    max_repair_retries: u32,
) -> TranslationResult {
    let language = catalog::language_name(&request.locale)
        .map(str::to_string)
        .unwrap_or_else(|| request.locale.clone());
    let limit = request.field.max_chars;
    let total_attempts = 1 + max_repair_retries as usize;

    let mut stricter: Option<String> = None;
    let mut last_overrun: Option<String> = None;

    for attempt in 1..=total_attempts {
        let system = build_system_message(request, &language, stricter.as_deref());
        debug!(
            target: "ai_log",
            provider = provider_name,
            locale = %request.locale,
            field = request.field.name,
            attempt,
            source_chars = request.text.chars().count(),
            "generation request"
        );

        let raw = match backend.generate(&system, &request.text, request.seed).await {
            Ok(raw) => raw,
            Err(LocflowError::Timeout(message)) => {
                warn!(
                    target: "ai_log",
                    provider = provider_name,
                    locale = %request.locale,
                    "generation timed out: {}",
                    message
                );
                return TranslationResult::failure(FailureReason::Timeout);
            }
            Err(e) => {
                warn!(
                    target: "ai_log",
                    provider = provider_name,
                    locale = %request.locale,
                    "generation failed: {}",
                    e
                );
                return TranslationResult::failure(FailureReason::Backend(e.to_string()));
            }
        };

        let mut candidate = raw.trim().to_string();
        if request.field.is_keywords {
            candidate = catalog::normalize_keywords(&candidate);
        }
        let char_count = candidate.chars().count();
        debug!(
            target: "ai_log",
            provider = provider_name,
            locale = %request.locale,
            attempt,
            output_chars = char_count,
            "generation response"
        );

        if candidate.is_empty() {
            if attempt == total_attempts {
                return TranslationResult::failure(FailureReason::EmptyOutput);
            }
            stricter = Some(
                "Retry: your previous output was empty. Translate fully and return only \
                 the translated text."
                    .to_string(),
            );
            continue;
        }

        if char_count <= limit {
            return TranslationResult::Success {
                text: candidate,
                char_count,
            };
        }

        warn!(
            target: "ai_log",
            provider = provider_name,
            locale = %request.locale,
            "output exceeded limit ({} > {}), retrying with stricter instructions",
            char_count,
            limit
        );
        stricter = Some(format!(
            "Your previous output was {} characters, exceeding the {} character limit. \
             Shorten it to at most {} characters. Prioritize brevity.",
            char_count, limit, limit
        ));
        last_overrun = Some(candidate);
    }

    // Salvage truncation at the boundary, still reported as a failure so
    // callers can distinguish it from a clean translation.
    let overrun = last_overrun.unwrap_or_default();
    let truncated = if request.field.is_keywords {
        catalog::truncate_keywords(&overrun, limit)
    } else {
        catalog::truncate_chars(&overrun, limit)
    };
    TranslationResult::failure(FailureReason::LimitExceeded {
        limit,
        char_count: overrun.chars().count(),
        truncated,
    })
}
