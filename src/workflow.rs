//! Localization workflows over the translation core.
//!
//! Fetches existing localizations from the catalog API, fans translation out
//! across the missing locales, and pushes the results back. Callers get a
//! per-locale summary; they never construct raw HTTP calls themselves.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::catalog;
use crate::client::EndpointRequest;
use crate::error::{LocflowError, Result};
use crate::orchestrator::{self, ProgressSink, RunOptions};
use crate::provider::TranslationResult;
use crate::session::SessionContext;

/// Aggregated outcome of one fan-out run, one entry per requested locale.
pub struct TranslationSummary {
    pub results: HashMap<String, TranslationResult>,
}

impl TranslationSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|r| r.is_success()).count()
    }

    /// Failed locales with their reasons, ordered for stable reporting.
    pub fn failures(&self) -> BTreeMap<String, String> {
        self.results
            .iter()
            .filter_map(|(locale, result)| match result {
                TranslationResult::Failure { reason } => {
                    Some((locale.clone(), reason.to_string()))
                }
                TranslationResult::Success { .. } => None,
            })
            .collect()
    }

    pub fn describe(&self) -> String {
        let failures = self.failures();
        let headline = format!("{} of {} locales translated", self.succeeded(), self.total());
        if failures.is_empty() {
            headline
        } else {
            let details: Vec<String> = failures
                .iter()
                .map(|(locale, reason)| format!("{}: {}", locale, reason))
                .collect();
            format!("{}; failed: {}", headline, details.join(", "))
        }
    }
}

/// One localized collection on the remote API to bring up to date.
#[derive(Debug, Clone)]
pub struct LocalizationTarget {
    /// Collection listing endpoint, paginated.
    pub list_path: String,
    /// Creation endpoint for new localizations.
    pub create_path: String,
    /// JSON:API resource type used in write payloads.
    pub resource_type: String,
    /// Remote attribute holding the localized text.
    pub attribute: String,
    /// Field spec name governing the character limit.
    pub field: String,
    pub target_locales: Vec<String>,
    /// Overrides the base locale's existing value as translation source.
    pub source_text: Option<String>,
}

/// Outcome of a full fetch-translate-push run.
pub struct LocalizationReport {
    pub summary: TranslationSummary,
    pub saved: usize,
    pub save_failures: BTreeMap<String, String>,
}

pub struct LocalizationWorkflow<'a> {
    session: &'a SessionContext,
    options: RunOptions,
}

impl<'a> LocalizationWorkflow<'a> {
    pub fn new(session: &'a SessionContext, options: RunOptions) -> Self {
        Self { session, options }
    }

    /// Translate one source text into every target locale, without touching
    /// the remote API.
    pub async fn translate_field(
        &self,
        source_text: &str,
        field_name: &str,
        target_locales: &[String],
        progress: Arc<dyn ProgressSink>,
    ) -> Result<TranslationSummary> {
        let field = catalog::field_spec(field_name)
            .ok_or_else(|| LocflowError::UnknownField(field_name.to_string()))?;
        for locale in target_locales {
            if !catalog::is_supported(locale) {
                return Err(LocflowError::UnknownLocale(locale.clone()));
            }
        }

        info!(
            "Translating field {} ({} chars max) to {} locales",
            field.name,
            field.max_chars,
            target_locales.len()
        );
        let results = orchestrator::run(
            target_locales,
            |locale| self.session.request_for(source_text, locale, field),
            self.session.provider.clone(),
            &self.options,
            progress,
        )
        .await;

        Ok(TranslationSummary { results })
    }

    /// Bring a localized collection up to date: fetch what exists, translate
    /// the missing locales from the base locale's text, and push the results.
    pub async fn localize_collection(
        &self,
        target: &LocalizationTarget,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<LocalizationReport> {
        let existing = self
            .session
            .client
            .fetch_all_items(EndpointRequest::get(&target.list_path))
            .await?;

        let mut existing_ids: HashMap<String, String> = HashMap::new();
        let mut existing_values: HashMap<String, String> = HashMap::new();
        for item in &existing {
            let Some(locale) = item
                .pointer("/attributes/locale")
                .and_then(Value::as_str)
            else {
                continue;
            };
            if let Some(id) = item.get("id").and_then(Value::as_str) {
                existing_ids.insert(locale.to_string(), id.to_string());
            }
            if let Some(value) = item
                .pointer(&format!("/attributes/{}", target.attribute))
                .and_then(Value::as_str)
            {
                existing_values.insert(locale.to_string(), value.to_string());
            }
        }

        let available: Vec<String> = existing_ids.keys().cloned().collect();
        let base_locale = catalog::detect_base_locale(&available);
        let source_text = target
            .source_text
            .clone()
            .or_else(|| {
                base_locale
                    .as_ref()
                    .and_then(|locale| existing_values.get(locale).cloned())
            })
            .ok_or_else(|| {
                LocflowError::Translation(
                    "No source text: no override given and no base localization found".to_string(),
                )
            })?;
        if let Some(base) = &base_locale {
            info!("Base locale {} provides the source text", base);
        }

        let missing: Vec<String> = target
            .target_locales
            .iter()
            .filter(|locale| Some(locale.as_str()) != base_locale.as_deref())
            .filter(|locale| {
                existing_values
                    .get(locale.as_str())
                    .map_or(true, |value| value.is_empty())
            })
            .cloned()
            .collect();
        info!(
            "{} of {} target locales need translation",
            missing.len(),
            target.target_locales.len()
        );

        let summary = self
            .translate_field(&source_text, &target.field, &missing, progress)
            .await?;

        let mut saved = 0;
        let mut save_failures = BTreeMap::new();
        for (locale, result) in &summary.results {
            let TranslationResult::Success { text, .. } = result else {
                continue;
            };
            let outcome = match existing_ids.get(locale) {
                Some(id) => self.update_localization(target, id, text).await,
                None => self.create_localization(target, locale, text).await,
            };
            match outcome {
                Ok(()) => saved += 1,
                Err(e) => {
                    warn!("Failed to save localization for {}: {}", locale, e);
                    save_failures.insert(locale.clone(), e.to_string());
                }
            }
        }
        info!("Saved {}/{} translated locales", saved, summary.succeeded());

        Ok(LocalizationReport {
            summary,
            saved,
            save_failures,
        })
    }

    async fn update_localization(
        &self,
        target: &LocalizationTarget,
        id: &str,
        text: &str,
    ) -> Result<()> {
        let mut attributes = serde_json::Map::new();
        attributes.insert(target.attribute.clone(), json!(text));
        let body = json!({
            "data": {
                "type": target.resource_type,
                "id": id,
                "attributes": attributes
            }
        });
        let path = format!("/v1/{}/{}", target.resource_type, id);
        self.session
            .client
            .execute(&EndpointRequest::patch(path, body))
            .await?;
        Ok(())
    }

    async fn create_localization(
        &self,
        target: &LocalizationTarget,
        locale: &str,
        text: &str,
    ) -> Result<()> {
        let mut attributes = serde_json::Map::new();
        attributes.insert("locale".to_string(), json!(locale));
        attributes.insert(target.attribute.clone(), json!(text));
        let body = json!({
            "data": {
                "type": target.resource_type,
                "attributes": attributes
            }
        });
        self.session
            .client
            .execute(&EndpointRequest::post(&target.create_path, body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_keys;
    use crate::client::{EndpointResponse, Method, RemoteClient, Transport};
    use crate::orchestrator::NullProgress;
    use crate::provider::{FailureReason, TranslationProvider, TranslationRequest};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct RecordingTransport {
        responses: Mutex<VecDeque<EndpointResponse>>,
        requests: Mutex<Vec<(Method, String)>>,
    }

    impl RecordingTransport {
        fn new(responses: Vec<EndpointResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: &EndpointRequest, _bearer: &str) -> Result<EndpointResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((request.method, request.path.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LocflowError::Translation("script exhausted".to_string()))
        }
    }

    struct EchoProvider;

    #[async_trait]
    impl TranslationProvider for EchoProvider {
        async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
            if request.locale == "fi" {
                TranslationResult::failure(FailureReason::Timeout)
            } else {
                TranslationResult::success(format!("[{}] app", request.locale))
            }
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn response(status: u16, body: Value) -> EndpointResponse {
        EndpointResponse {
            status,
            headers: HashMap::new(),
            body,
            request_id: None,
        }
    }

    fn session(transport: Arc<RecordingTransport>) -> SessionContext {
        let client = Arc::new(RemoteClient::new(transport, test_keys::test_credential()));
        SessionContext::new(Arc::new(EchoProvider), client, None).with_seed(1)
    }

    #[tokio::test]
    async fn summary_reports_successes_and_failure_reasons() {
        let transport = RecordingTransport::new(vec![]);
        let session = session(transport);
        let workflow = LocalizationWorkflow::new(&session, RunOptions::new(2));

        let locales = vec!["ja".to_string(), "ko".to_string(), "fi".to_string()];
        let summary = workflow
            .translate_field("My Travel App", "name", &locales, Arc::new(NullProgress))
            .await
            .unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded(), 2);
        let description = summary.describe();
        assert!(description.starts_with("2 of 3 locales translated"));
        assert!(description.contains("fi: generation request timed out"));
    }

    #[tokio::test]
    async fn unknown_field_and_locale_are_rejected_up_front() {
        let transport = RecordingTransport::new(vec![]);
        let session = session(transport);
        let workflow = LocalizationWorkflow::new(&session, RunOptions::new(1));

        let result = workflow
            .translate_field("x", "nonexistent", &["ja".to_string()], Arc::new(NullProgress))
            .await;
        assert!(matches!(result, Err(LocflowError::UnknownField(_))));

        let result = workflow
            .translate_field("x", "name", &["xx-XX".to_string()], Arc::new(NullProgress))
            .await;
        assert!(matches!(result, Err(LocflowError::UnknownLocale(_))));
    }

    #[tokio::test]
    async fn localize_collection_creates_missing_and_updates_existing() {
        let listing = response(
            200,
            json!({
                "data": [
                    { "id": "loc-en", "attributes": { "locale": "en-US", "name": "My Travel App" } },
                    { "id": "loc-ja", "attributes": { "locale": "ja", "name": "" } }
                ]
            }),
        );
        // One update for ja (existing id, empty value) and one create for ko.
        let transport = RecordingTransport::new(vec![
            listing,
            response(200, json!({ "data": { "id": "saved" } })),
            response(201, json!({ "data": { "id": "created" } })),
        ]);
        let session = session(transport.clone());
        let workflow = LocalizationWorkflow::new(&session, RunOptions::new(2));

        let target = LocalizationTarget {
            list_path: "/v1/apps/123/localizations".to_string(),
            create_path: "/v1/appLocalizations".to_string(),
            resource_type: "appLocalizations".to_string(),
            attribute: "name".to_string(),
            field: "name".to_string(),
            target_locales: vec!["en-US".to_string(), "ja".to_string(), "ko".to_string()],
            source_text: None,
        };

        let report = workflow
            .localize_collection(&target, Arc::new(NullProgress))
            .await
            .unwrap();

        // The base locale is skipped; ja and ko are translated and saved.
        assert_eq!(report.summary.total(), 2);
        assert_eq!(report.saved, 2);
        assert!(report.save_failures.is_empty());

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0], (Method::Get, "/v1/apps/123/localizations".to_string()));
        let writes: Vec<_> = requests[1..].iter().cloned().collect();
        assert!(writes.contains(&(Method::Patch, "/v1/appLocalizations/loc-ja".to_string())));
        assert!(writes.contains(&(Method::Post, "/v1/appLocalizations".to_string())));
    }

    #[tokio::test]
    async fn missing_source_text_is_an_error() {
        let transport = RecordingTransport::new(vec![response(200, json!({ "data": [] }))]);
        let session = session(transport);
        let workflow = LocalizationWorkflow::new(&session, RunOptions::new(1));

        let target = LocalizationTarget {
            list_path: "/v1/apps/123/localizations".to_string(),
            create_path: "/v1/appLocalizations".to_string(),
            resource_type: "appLocalizations".to_string(),
            attribute: "name".to_string(),
            field: "name".to_string(),
            target_locales: vec!["ja".to_string()],
            source_text: None,
        };

        let result = workflow
            .localize_collection(&target, Arc::new(NullProgress))
            .await;
        assert!(matches!(result, Err(LocflowError::Translation(_))));
    }
}
