//! Bounded-concurrency locale fan-out.
//!
//! Runs one translation task per locale under a fixed concurrency cap,
//! collecting exactly one result per locale into preallocated slots. A
//! failure in one locale never aborts the others; retries live in the
//! provider and client layers, not here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::provider::{FailureReason, TranslationProvider, TranslationRequest, TranslationResult};

/// Cooperative cancellation handle. Cancelling stops new dispatches; tasks
/// already in flight run to completion.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives the monotonically increasing count of completed locale units.
pub trait ProgressSink: Send + Sync {
    fn completed(&self, done: usize, total: usize);
}

/// Progress sink that reports through the log.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn completed(&self, done: usize, total: usize) {
        info!("Translated {}/{} locales", done, total);
    }
}

/// Progress sink for callers that do not track progress.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn completed(&self, _done: usize, _total: usize) {}
}

#[derive(Clone)]
pub struct RunOptions {
    /// Concurrent translation cap; 0 picks the available parallelism.
    pub concurrency: usize,
    pub cancel: CancelFlag,
}

impl RunOptions {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            cancel: CancelFlag::new(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Sensible default tied to the host's parallelism.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Translate every locale through the provider under the concurrency cap.
///
/// The returned map holds exactly one entry per input locale, successes and
/// failures alike, in no particular completion order.
pub async fn run<F>(
    locales: &[String],
    make_request: F,
    provider: Arc<dyn TranslationProvider>,
    options: &RunOptions,
    progress: Arc<dyn ProgressSink>,
) -> HashMap<String, TranslationResult>
where
    F: Fn(&str) -> TranslationRequest,
{
    let total = locales.len();
    let concurrency = match options.concurrency {
        0 => default_concurrency(),
        n => n,
    }
    .max(1);
    debug!("Dispatching {} locales with concurrency {}", total, concurrency);

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let counter = Arc::new(Mutex::new(0usize));

    // One preallocated slot per locale; tasks report back by index so no
    // shared growable structure is contended.
    let mut slots: Vec<Option<TranslationResult>> = vec![None; total];
    let mut tasks = JoinSet::new();

    for (index, locale) in locales.iter().enumerate() {
        let request = make_request(locale);
        let provider = provider.clone();
        let semaphore = semaphore.clone();
        let cancel = options.cancel.clone();
        let counter = counter.clone();
        let progress = progress.clone();

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore never closes");

            let result = if cancel.is_cancelled() {
                TranslationResult::failure(FailureReason::Cancelled)
            } else {
                provider.translate(&request).await
            };

            // Count and report under one lock so every sink observes a
            // strictly increasing sequence.
            {
                let mut done = counter.lock().expect("progress lock never poisoned");
                *done += 1;
                progress.completed(*done, total);
            }
            (index, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => warn!("Translation task failed to join: {}", e),
        }
    }

    locales
        .iter()
        .cloned()
        .zip(slots)
        .map(|(locale, slot)| {
            let result = slot.unwrap_or_else(|| {
                TranslationResult::failure(FailureReason::Backend(
                    "translation task aborted".to_string(),
                ))
            });
            (locale, result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::provider::TranslationProvider;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct FakeProvider {
        fail_locales: Vec<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeProvider {
        fn new(fail_locales: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                fail_locales: fail_locales.into_iter().map(str::to_string).collect(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranslationProvider for FakeProvider {
        async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_locales.contains(&request.locale) {
                TranslationResult::failure(FailureReason::Timeout)
            } else {
                TranslationResult::success(format!("translated-{}", request.locale))
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct RecordingProgress {
        seen: Mutex<Vec<usize>>,
    }

    impl ProgressSink for RecordingProgress {
        fn completed(&self, done: usize, _total: usize) {
            self.seen.lock().unwrap().push(done);
        }
    }

    fn make_request(locale: &str) -> TranslationRequest {
        TranslationRequest {
            text: "Hello".to_string(),
            locale: locale.to_string(),
            field: catalog::field_spec("name").unwrap(),
            seed: 7,
            refinement: None,
        }
    }

    fn locales(n: usize) -> Vec<String> {
        catalog::LOCALES
            .iter()
            .take(n)
            .map(|(tag, _)| tag.to_string())
            .collect()
    }

    #[tokio::test]
    async fn every_locale_gets_exactly_one_result() {
        let targets = locales(12);
        let provider = FakeProvider::new(vec!["ar", "cs"]);

        let results = run(
            &targets,
            make_request,
            provider,
            &RunOptions::new(4),
            Arc::new(NullProgress),
        )
        .await;

        assert_eq!(results.len(), 12);
        for locale in &targets {
            assert!(results.contains_key(locale), "missing {}", locale);
        }
        assert!(!results["ar"].is_success());
        assert!(!results["cs"].is_success());
        assert!(results["da"].is_success());
    }

    #[tokio::test]
    async fn failures_do_not_abort_other_locales() {
        let targets = locales(8);
        let all_fail: Vec<&str> = targets.iter().map(String::as_str).collect();
        let provider = FakeProvider::new(all_fail);

        let results = run(
            &targets,
            make_request,
            provider,
            &RunOptions::new(2),
            Arc::new(NullProgress),
        )
        .await;

        assert_eq!(results.len(), 8);
        assert!(results.values().all(|result| !result.is_success()));
    }

    #[tokio::test]
    async fn concurrency_cap_is_respected() {
        let targets = locales(16);
        let provider = FakeProvider::new(vec![]);

        run(
            &targets,
            make_request,
            provider.clone(),
            &RunOptions::new(3),
            Arc::new(NullProgress),
        )
        .await;

        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn progress_reports_every_unit_in_increasing_order() {
        let targets = locales(10);
        let provider = FakeProvider::new(vec![]);
        let progress = Arc::new(RecordingProgress {
            seen: Mutex::new(Vec::new()),
        });

        run(
            &targets,
            make_request,
            provider,
            &RunOptions::new(4),
            progress.clone(),
        )
        .await;

        // No lost updates, and the sink never sees counts out of order.
        let seen = progress.seen.lock().unwrap().clone();
        assert_eq!(seen, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn cancelled_run_dispatches_nothing_but_reports_every_locale() {
        let targets = locales(6);
        let provider = FakeProvider::new(vec![]);
        let options = RunOptions::new(2);
        options.cancel.cancel();

        let results = run(
            &targets,
            make_request,
            provider.clone(),
            &options,
            Arc::new(NullProgress),
        )
        .await;

        assert_eq!(results.len(), 6);
        assert!(results.values().all(|result| matches!(
            result,
            TranslationResult::Failure {
                reason: FailureReason::Cancelled
            }
        )));
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrency_floor_is_one() {
        let targets = locales(3);
        let provider = FakeProvider::new(vec![]);

        let results = run(
            &targets,
            make_request,
            provider.clone(),
            &RunOptions::new(1),
            Arc::new(NullProgress),
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
