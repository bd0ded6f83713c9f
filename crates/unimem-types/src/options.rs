//! Per-call options accepted by the unified router.
//!
//! These are transient: built by the caller for one call and dropped after.

use crate::local::SortDirection;
use crate::memory::MemorySource;
use crate::platform::ApiVersion;
use std::collections::HashMap;
use std::time::Duration;

/// Options for list, get, create, update and delete calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Explicit backend; falls back to the flag default when `None`.
    pub source: Option<MemorySource>,
    pub user_id: Option<String>,
    pub agent_id: Option<String>,
    pub app_id: Option<String>,
    pub run_id: Option<String>,
    /// Local app name used when creating memories.
    pub app: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub categories: Option<Vec<String>>,
    pub app_ids: Option<Vec<String>>,
    pub sort_column: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub show_archived: Option<bool>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    /// Whether the backend should run extraction on created text.
    pub infer: Option<bool>,
    pub api_version: Option<ApiVersion>,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: MemorySource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for search calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Scoping, pagination and backend selection.
    pub request: RequestOptions,
    /// Maximum number of hits.
    pub limit: Option<u32>,
    /// Minimum relevance score (Platform only).
    pub threshold: Option<f64>,
    /// Free-form filter expression (Platform v2 only).
    pub filters: Option<serde_json::Value>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_filters(mut self, filters: serde_json::Value) -> Self {
        self.filters = Some(filters);
        self
    }
}
