// Resilient remote API client
//
// Executes authenticated requests against the catalog API with:
// - bearer token caching and synchronized refresh
// - bounded conflict retry with exponential backoff and jitter
// - a single token re-mint on credential rejection
// - cursor pagination with a repeated-cursor guard

pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub use transport::{EndpointRequest, EndpointResponse, HttpTransport, Method, Transport};

use crate::auth::{self, Credential, Token};
use crate::error::{LocflowError, Result};

/// Retry bounds for transient write conflicts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed when the remote keeps answering with a
    /// conflict status. Must be >= 1.
    pub max_conflict_attempts: u32,
    /// Base delay, doubled on each subsequent attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_conflict_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// Authenticated client for the remote catalog API.
///
/// Stateless per call except for the token cache; safe to share across
/// concurrent callers.
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    credential: Credential,
    token: RwLock<Option<Token>>,
    retry: RetryPolicy,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn Transport>, credential: Credential) -> Self {
        Self {
            transport,
            credential,
            token: RwLock::new(None),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Current bearer token, minting a fresh one when expired or absent.
    async fn bearer(&self) -> Result<String> {
        let now = Utc::now();
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if token.is_valid(now) {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut guard = self.token.write().await;
        // Another caller may have refreshed while we waited for the lock.
        let now = Utc::now();
        if let Some(token) = guard.as_ref() {
            if token.is_valid(now) {
                return Ok(token.value.clone());
            }
        }
        let token = auth::mint(&self.credential, now)?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    /// Mint a fresh token unconditionally, replacing whatever is cached.
    async fn force_refresh(&self) -> Result<String> {
        let mut guard = self.token.write().await;
        let token = auth::mint(&self.credential, Utc::now())?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    /// Execute one request with auth refresh and conflict retry.
    pub async fn execute(&self, request: &EndpointRequest) -> Result<EndpointResponse> {
        let mut bearer = self.bearer().await?;
        let mut refreshed = false;
        let mut conflicts = 0u32;

        loop {
            let response = self.transport.send(request, &bearer).await?;

            if response.is_auth_failure() {
                if refreshed {
                    return Err(LocflowError::Auth(format!(
                        "credential rejected twice for {} {}",
                        request.method.as_str(),
                        request.path
                    )));
                }
                warn!("Credential rejected, minting a fresh token and retrying once");
                refreshed = true;
                bearer = self.force_refresh().await?;
                continue;
            }

            if response.is_conflict() {
                conflicts += 1;
                if conflicts >= self.retry.max_conflict_attempts {
                    return Err(LocflowError::ConflictExhausted {
                        status: response.status,
                        body: response.body.to_string(),
                    });
                }
                let delay = backoff_delay(self.retry.base_delay, conflicts);
                debug!(
                    "Write conflict on {} {} (attempt {}), retrying in {:?}",
                    request.method.as_str(),
                    request.path,
                    conflicts,
                    delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !response.is_success() {
                return Err(LocflowError::RemoteApi {
                    status: response.status,
                    body: response.body.to_string(),
                });
            }

            return Ok(response);
        }
    }

    /// Lazily walk a paginated collection starting from `initial`.
    ///
    /// Restartable only by rebuilding from the same initial request.
    pub fn paginate(&self, initial: EndpointRequest) -> Paginator<'_> {
        Paginator {
            client: self,
            initial,
            cursor: None,
            done: false,
        }
    }

    /// Collect every `data` item across all pages of a collection.
    pub async fn fetch_all_items(&self, initial: EndpointRequest) -> Result<Vec<Value>> {
        let mut paginator = self.paginate(initial);
        let mut items = Vec::new();
        while let Some(page) = paginator.next_page().await? {
            items.extend(page.items());
        }
        Ok(items)
    }
}

/// Exponential backoff with jitter so concurrent retries spread out.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let doubled = base.saturating_mul(1u32 << (attempt.saturating_sub(1)).min(8));
    let jitter_ceiling = (base.as_millis() as u64 / 2).max(1);
    let jitter = rand::thread_rng().gen_range(0..jitter_ceiling);
    doubled + Duration::from_millis(jitter)
}

/// Cursor-following iterator over a paginated remote collection.
pub struct Paginator<'a> {
    client: &'a RemoteClient,
    initial: EndpointRequest,
    cursor: Option<String>,
    done: bool,
}

impl Paginator<'_> {
    pub async fn next_page(&mut self) -> Result<Option<EndpointResponse>> {
        if self.done {
            return Ok(None);
        }

        let request = match &self.cursor {
            None => self.initial.clone(),
            Some(cursor) => self.initial.with_cursor(cursor),
        };
        let response = self.client.execute(&request).await?;

        match response.next_cursor() {
            Some(next) if self.cursor.as_deref() == Some(next.as_str()) => {
                // A server repeating the same cursor would loop forever.
                warn!("Remote repeated pagination cursor {:?}, stopping", next);
                self.done = true;
            }
            Some(next) => self.cursor = Some(next),
            None => self.done = true,
        }

        Ok(Some(response))
    }
}
