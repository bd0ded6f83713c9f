//! Resilient HTTP transport shared by both backend clients.
//!
//! One `Transport` talks to one base URL. Every call goes through the same
//! pipeline:
//!
//! 1. request interceptors (per attempt)
//! 2. send with auth header and per-request timeout
//! 3. non-2xx → `MemoryError::Http`, no response → `MemoryError::Network`
//! 4. error interceptors, then the retry policy decides whether to go again
//! 5. response interceptors on the decoded JSON, then typed deserialization
//!
//! Stats and lifecycle events are updated along the way.

use crate::events::{ClientEvent, EventEmitter, EventListener};
use crate::interceptor::{InterceptorChain, OutgoingRequest};
use crate::retry::{retry_async, RetryOutcome, RetryPolicy};
use crate::stats::{ClientStats, StatsRecorder};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use unimem_types::config::DEFAULT_TIMEOUT_SECS;
use unimem_types::{MemoryError, MemoryResult};
use zeroize::Zeroizing;

/// Longest slice of an error body copied into an error message.
const MAX_ERROR_SNIPPET: usize = 200;

/// How a transport authenticates.
pub enum Auth {
    None,
    /// `Authorization: Bearer <token>` (Local backend).
    Bearer(Zeroizing<String>),
    /// `Authorization: Token <api key>` (Platform backend).
    Token(Zeroizing<String>),
}

impl Auth {
    /// Bearer auth, or none when the token is missing or blank.
    pub fn bearer(token: Option<String>) -> Self {
        match token {
            Some(t) if !t.trim().is_empty() => Self::Bearer(Zeroizing::new(t)),
            _ => Self::None,
        }
    }

    pub fn token(api_key: String) -> Self {
        Self::Token(Zeroizing::new(api_key))
    }

    fn header_value(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Bearer(t) => Some(format!("Bearer {}", t.as_str())),
            Self::Token(k) => Some(format!("Token {}", k.as_str())),
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Token(_) => f.write_str("Token(<redacted>)"),
        }
    }
}

/// Construction parameters for a transport.
pub struct TransportConfig {
    pub base_url: String,
    pub auth: Auth,
    /// Default per-request timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Listeners registered before `client:initialized` is emitted.
    pub listeners: Vec<Arc<dyn EventListener>>,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Self {
        Self {
            base_url: base_url.into(),
            auth,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            listeners: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

/// Method, query params, body and timeout override of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub params: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            params: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn post(body: serde_json::Value) -> Self {
        Self::new(Method::POST).with_body(body)
    }

    pub fn put(body: serde_json::Value) -> Self {
        Self::new(Method::PUT).with_body(body)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP engine with retries, interceptors, events and stats.
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
    timeout: Duration,
    policy: RetryPolicy,
    interceptors: InterceptorChain,
    events: EventEmitter,
    stats: StatsRecorder,
}

impl Transport {
    /// Build a transport. Fails on an unparseable base URL.
    pub fn new(config: TransportConfig) -> MemoryResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let parsed =
            url::Url::parse(&base_url).map_err(|e| MemoryError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MemoryError::InvalidUrl(format!(
                "{base_url}: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("unimem/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MemoryError::Config(format!("Failed to build HTTP client: {e}")))?;

        let events = EventEmitter::new();
        for listener in config.listeners {
            events.subscribe(listener);
        }

        let transport = Self {
            client,
            base_url,
            auth: config.auth,
            timeout: config.timeout,
            policy: config.retry,
            interceptors: InterceptorChain::new(),
            events,
            stats: StatsRecorder::new(),
        };
        transport.events.emit(&ClientEvent::ClientInitialized {
            base_url: transport.base_url.clone(),
        });
        Ok(transport)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn stats(&self) -> ClientStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Full URL for an endpoint path.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Execute a call with the retry policy and decode the body into `T`.
    pub async fn request<T>(&self, endpoint: &str, spec: RequestSpec) -> MemoryResult<T>
    where
        T: DeserializeOwned + Send,
    {
        self.stats.record_start();
        let started = Instant::now();
        let method = spec.method.to_string();
        let url = self.url_for(endpoint);
        let spec = &spec;

        let outcome = retry_async(
            &self.policy,
            move |attempt| self.attempt::<T>(endpoint, spec, attempt),
            |err| self.policy.is_retryable(err),
            |_, attempt, delay_ms| {
                self.events.emit(&ClientEvent::RequestRetry {
                    method: method.clone(),
                    url: url.clone(),
                    attempt,
                    delay_ms,
                })
            },
        )
        .await;

        match outcome {
            RetryOutcome::Success {
                result: (value, status),
                attempts,
            } => {
                let elapsed = started.elapsed();
                self.stats.record_success(elapsed.as_secs_f64() * 1000.0);
                self.events.emit(&ClientEvent::RequestSuccess {
                    method,
                    url,
                    status,
                    elapsed_ms: elapsed.as_millis() as u64,
                    attempts,
                });
                Ok(value)
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => {
                self.stats.record_failure();
                debug!(%method, %url, attempts, error = %last_error, "request failed");
                Err(last_error)
            }
        }
    }

    /// One attempt: send, classify, run error interceptors on failure.
    async fn attempt<T>(&self, endpoint: &str, spec: &RequestSpec, attempt: u32) -> MemoryResult<(T, u16)>
    where
        T: DeserializeOwned + Send,
    {
        let mut request = self.outgoing(endpoint, spec);
        match self.send::<T>(&mut request, attempt).await {
            Ok(ok) => Ok(ok),
            Err(err) => {
                let err = self.interceptors.apply_error(err);
                self.events.emit(&ClientEvent::RequestError {
                    method: request.method.to_string(),
                    url: self.url_for(&request.endpoint),
                    attempt,
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    fn outgoing(&self, endpoint: &str, spec: &RequestSpec) -> OutgoingRequest {
        let mut headers = BTreeMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());
        if let Some(auth) = self.auth.header_value() {
            headers.insert("authorization".to_string(), auth);
        }
        OutgoingRequest {
            method: spec.method.clone(),
            endpoint: endpoint.to_string(),
            headers,
            params: spec.params.clone(),
            body: spec.body.clone(),
            timeout: spec.timeout.unwrap_or(self.timeout),
        }
    }

    async fn send<T>(&self, request: &mut OutgoingRequest, attempt: u32) -> MemoryResult<(T, u16)>
    where
        T: DeserializeOwned + Send,
    {
        self.interceptors.apply_request(request)?;
        let url = self.url_for(&request.endpoint);
        self.events.emit(&ClientEvent::RequestStart {
            method: request.method.to_string(),
            url: url.clone(),
            attempt,
        });

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_builder() {
                MemoryError::Config(format!("Invalid request to {url}: {e}"))
            } else {
                MemoryError::Network(format!("{url}: {e}"))
            }
        })?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| MemoryError::Network(format!("{url}: failed to read body: {e}")))?;

        if !(200..300).contains(&status) {
            return Err(http_error(status, text));
        }

        let value = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                MemoryError::Serialization(format!("Invalid JSON from {url}: {e}"))
            })?
        };
        let value = self.interceptors.apply_response(value)?;
        let typed = serde_json::from_value(value).map_err(|e| {
            MemoryError::Serialization(format!("Unexpected response shape from {url}: {e}"))
        })?;
        Ok((typed, status))
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.events.emit(&ClientEvent::ClientDestroyed {
            base_url: self.base_url.clone(),
        });
    }
}

/// Build an `Http` error from a status and raw body.
///
/// Looks for `error`, `detail` or `message` and a `code` in JSON bodies;
/// otherwise uses a truncated body or the status reason.
pub(crate) fn http_error(status: u16, body: String) -> MemoryError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(&body).ok();

    let message = parsed
        .as_ref()
        .and_then(|v| {
            ["error", "detail", "message"]
                .iter()
                .find_map(|key| v.get(*key))
                .map(|m| match m {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.chars().take(MAX_ERROR_SNIPPET).collect())
        })
        .unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown error")
                .to_string()
        });

    let code = parsed.as_ref().and_then(|v| v.get("code")).map(|c| match c {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    MemoryError::Http {
        status,
        code,
        message,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_extracts_json_fields() {
        let err = http_error(
            400,
            r#"{"error": "messages must not be empty", "code": "invalid_input"}"#.to_string(),
        );
        match err {
            MemoryError::Http {
                status,
                code,
                message,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("invalid_input"));
                assert_eq!(message, "messages must not be empty");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_http_error_detail_object() {
        let err = http_error(422, r#"{"detail": [{"loc": ["body"]}]}"#.to_string());
        let MemoryError::Http { message, code, .. } = err else {
            panic!("expected http error");
        };
        assert!(message.contains("loc"));
        assert!(code.is_none());
    }

    #[test]
    fn test_http_error_plain_and_empty_body() {
        let MemoryError::Http { message, .. } = http_error(502, "bad gateway".to_string()) else {
            panic!("expected http error");
        };
        assert_eq!(message, "bad gateway");

        let MemoryError::Http { message, body, .. } = http_error(503, String::new()) else {
            panic!("expected http error");
        };
        assert_eq!(message, "Service Unavailable");
        assert!(body.is_empty());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let err = Transport::new(TransportConfig::new("not a url", Auth::None)).err();
        assert!(matches!(err, Some(MemoryError::InvalidUrl(_))));
        let err = Transport::new(TransportConfig::new("ftp://host", Auth::None)).err();
        assert!(matches!(err, Some(MemoryError::InvalidUrl(_))));
    }

    #[test]
    fn test_url_for_joins_paths() {
        let t = Transport::new(TransportConfig::new("http://localhost:8765/", Auth::None)).unwrap();
        assert_eq!(t.base_url(), "http://localhost:8765");
        assert_eq!(t.url_for("/api/v1/memories/"), "http://localhost:8765/api/v1/memories/");
        assert_eq!(t.url_for("v1/ping/"), "http://localhost:8765/v1/ping/");
    }

    #[test]
    fn test_auth_headers() {
        assert_eq!(
            Auth::token("k1".into()).header_value().as_deref(),
            Some("Token k1")
        );
        assert_eq!(
            Auth::bearer(Some("t1".into())).header_value().as_deref(),
            Some("Bearer t1")
        );
        assert!(Auth::bearer(Some("  ".into())).header_value().is_none());
        assert_eq!(format!("{:?}", Auth::token("secret".into())), "Token(<redacted>)");
    }

    #[test]
    fn test_initialized_and_destroyed_events() {
        use std::sync::Mutex;
        let names = Arc::new(Mutex::new(Vec::new()));
        let n = names.clone();
        let config = TransportConfig::new("http://127.0.0.1:9", Auth::None).with_listener(Arc::new(
            move |e: &ClientEvent| -> Result<(), String> {
                n.lock().unwrap().push(e.name());
                Ok(())
            },
        ));
        let transport = Transport::new(config).unwrap();
        drop(transport);
        assert_eq!(
            *names.lock().unwrap(),
            vec!["client:initialized", "client:destroyed"]
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = TransportConfig::new("http://127.0.0.1:19997", Auth::None)
            .with_retry(RetryPolicy::none())
            .with_timeout(Duration::from_secs(2));
        let transport = Transport::new(config).unwrap();
        let err = transport
            .request::<serde_json::Value>("/v1/ping/", RequestSpec::get())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Network(_)), "got {err:?}");
        let stats = transport.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.failed_requests, 1);
    }
}
