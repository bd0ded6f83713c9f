//! Native wire schema of the Local (same-host) memory service.
//!
//! Timestamps on this backend are epoch milliseconds.

use crate::memory::MemoryState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default page size used by the Local filter endpoint.
pub const DEFAULT_LOCAL_PAGE_SIZE: u32 = 10;

/// A memory record as returned by the Local backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMemory {
    pub id: String,
    pub content: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<MemoryState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(
        default,
        rename = "metadata_",
        alias = "metadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Paginated response of `POST /api/v1/memories/filter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalPage {
    pub items: Vec<LocalMemory>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

/// Sort order accepted by the filter endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Body of `POST /api/v1/memories/filter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalFilterRequest {
    pub user_id: String,
    pub page: u32,
    pub size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_archived: Option<bool>,
}

impl LocalFilterRequest {
    /// First page for a user, default size, no filters.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            page: 1,
            size: DEFAULT_LOCAL_PAGE_SIZE,
            search_query: None,
            app_ids: None,
            category_ids: None,
            sort_column: None,
            sort_direction: None,
            show_archived: None,
        }
    }
}

/// Body of `POST /api/v1/memories/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalCreateRequest {
    pub user_id: String,
    pub text: String,
    pub infer: bool,
    pub app: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Body of `PUT /api/v1/memories/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalUpdateRequest {
    pub memory_content: String,
    pub user_id: String,
}

/// Body of `POST /api/v1/memories/actions/pause`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalStateRequest {
    pub memory_ids: Vec<String>,
    pub state: MemoryState,
    pub user_id: String,
}
