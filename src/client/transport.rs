use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{LocflowError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// One request against the remote API, immutable once built.
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl EndpointRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Derive the same request addressed at a pagination cursor.
    pub fn with_cursor(&self, cursor: &str) -> Self {
        let mut request = self.clone();
        request.query.retain(|(key, _)| key != "cursor");
        request.query.push(("cursor".to_string(), cursor.to_string()));
        request
    }
}

/// One response from the remote API, never mutated after creation.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Value,
    pub request_id: Option<String>,
}

impl EndpointResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    pub fn is_auth_failure(&self) -> bool {
        self.status == 401
    }

    /// Pagination cursor for the next page, when the envelope carries one.
    pub fn next_cursor(&self) -> Option<String> {
        self.body
            .get("next")
            .or_else(|| self.body.get("links").and_then(|links| links.get("next")))
            .and_then(Value::as_str)
            .filter(|cursor| !cursor.is_empty())
            .map(str::to_string)
    }

    /// Items in the `data` array of the envelope, if present.
    pub fn items(&self) -> Vec<Value> {
        self.body
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

/// Wire seam for the remote API so retry logic can be exercised against
/// in-process doubles.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &EndpointRequest, bearer: &str) -> Result<EndpointResponse>;
}

/// Production transport backed by reqwest with a per-call timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &EndpointRequest, bearer: &str) -> Result<EndpointResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} {}", request.method.as_str(), url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };

        builder = builder.bearer_auth(bearer).query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LocflowError::Timeout(format!("{} {}", request.method.as_str(), request.path))
            } else {
                LocflowError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let request_id = headers.get("x-request-id").cloned();

        let text = response.text().await.unwrap_or_default();
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(EndpointResponse {
            status,
            headers,
            body,
            request_id,
        })
    }
}
