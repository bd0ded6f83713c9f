//! Request/response/error interceptor pipeline.
//!
//! - Request interceptors run in registration order on every attempt and may
//!   rewrite the method, headers, query params, body or timeout.
//! - Response interceptors run in registration order on the decoded JSON body
//!   before it is deserialized into the caller's type.
//! - Error interceptors run on every failed attempt, before the retry check,
//!   and may replace the error. The retry check sees the replacement.

use reqwest::Method;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use unimem_types::{MemoryError, MemoryResult};

/// A request about to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub method: Method,
    /// Endpoint path relative to the transport base URL.
    pub endpoint: String,
    /// Header map, keys lowercased.
    pub headers: BTreeMap<String, String>,
    pub params: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

impl OutgoingRequest {
    /// Set a header, replacing any previous value for the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

pub trait RequestInterceptor: Send + Sync {
    /// Rewrite the request in place. `Err` fails the attempt without sending.
    fn intercept(&self, request: &mut OutgoingRequest) -> MemoryResult<()>;
}

pub trait ResponseInterceptor: Send + Sync {
    /// Transform the decoded body.
    fn intercept(&self, body: serde_json::Value) -> MemoryResult<serde_json::Value>;
}

pub trait ErrorInterceptor: Send + Sync {
    /// Reclassify or rewrap a failed attempt's error.
    fn intercept(&self, error: MemoryError) -> MemoryError;
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut OutgoingRequest) -> MemoryResult<()> + Send + Sync,
{
    fn intercept(&self, request: &mut OutgoingRequest) -> MemoryResult<()> {
        self(request)
    }
}

impl<F> ResponseInterceptor for F
where
    F: Fn(serde_json::Value) -> MemoryResult<serde_json::Value> + Send + Sync,
{
    fn intercept(&self, body: serde_json::Value) -> MemoryResult<serde_json::Value> {
        self(body)
    }
}

impl<F> ErrorInterceptor for F
where
    F: Fn(MemoryError) -> MemoryError + Send + Sync,
{
    fn intercept(&self, error: MemoryError) -> MemoryError {
        self(error)
    }
}

/// The three interceptor lists of one transport.
#[derive(Default)]
pub struct InterceptorChain {
    request: RwLock<Vec<Arc<dyn RequestInterceptor>>>,
    response: RwLock<Vec<Arc<dyn ResponseInterceptor>>>,
    error: RwLock<Vec<Arc<dyn ErrorInterceptor>>>,
}

fn snapshot<T: ?Sized>(lock: &RwLock<Vec<Arc<T>>>) -> Vec<Arc<T>> {
    match lock.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn push<T: ?Sized>(lock: &RwLock<Vec<Arc<T>>>, item: Arc<T>) {
    match lock.write() {
        Ok(mut guard) => guard.push(item),
        Err(poisoned) => poisoned.into_inner().push(item),
    }
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_request(&self, interceptor: Arc<dyn RequestInterceptor>) {
        push(&self.request, interceptor);
    }

    pub fn add_response(&self, interceptor: Arc<dyn ResponseInterceptor>) {
        push(&self.response, interceptor);
    }

    pub fn add_error(&self, interceptor: Arc<dyn ErrorInterceptor>) {
        push(&self.error, interceptor);
    }

    /// Run request interceptors in order, stopping at the first failure.
    pub fn apply_request(&self, request: &mut OutgoingRequest) -> MemoryResult<()> {
        for interceptor in snapshot(&self.request) {
            interceptor.intercept(request)?;
        }
        Ok(())
    }

    /// Run response interceptors in order, threading the body through.
    pub fn apply_response(&self, body: serde_json::Value) -> MemoryResult<serde_json::Value> {
        snapshot(&self.response)
            .into_iter()
            .try_fold(body, |body, interceptor| interceptor.intercept(body))
    }

    /// Run error interceptors in order, threading the error through.
    pub fn apply_error(&self, error: MemoryError) -> MemoryError {
        snapshot(&self.error)
            .into_iter()
            .fold(error, |error, interceptor| interceptor.intercept(error))
    }
}
