//! Native wire schema of the Platform (cloud) memory API.
//!
//! Timestamps on this backend are ISO-8601 strings.

use crate::memory::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Largest batch the Platform batch endpoints accept.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Listing/search API flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    /// Query-parameter GET endpoints.
    #[default]
    V1,
    /// JSON-filter POST endpoints.
    V2,
}

/// Text payload nested under `data` in add/update event responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMemoryData {
    pub memory: String,
}

/// A memory record as returned by the Platform backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlatformMemory {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    /// Present on add responses instead of `memory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PlatformMemoryData>,
    /// `ADD` / `UPDATE` / `DELETE` on add responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl PlatformMemory {
    /// The memory text, whichever field the backend put it in.
    pub fn text(&self) -> Option<&str> {
        self.memory
            .as_deref()
            .or_else(|| self.data.as_ref().map(|d| d.memory.as_str()))
    }
}

/// List/search/add response: a paginated envelope, a bare `results`
/// envelope, or a bare array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlatformListing {
    Paginated {
        count: u64,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<PlatformMemory>,
    },
    Wrapped {
        results: Vec<PlatformMemory>,
    },
    List(Vec<PlatformMemory>),
}

impl PlatformListing {
    /// Records on this page, regardless of envelope.
    pub fn into_results(self) -> Vec<PlatformMemory> {
        match self {
            Self::Paginated { results, .. } | Self::Wrapped { results } => results,
            Self::List(items) => items,
        }
    }
}

/// Options shared by add, list and search calls.
///
/// Serialized fields form the request payload (or query string for v1
/// GETs); `None` values are never sent. `api_version`, `page` and
/// `page_size` steer endpoint selection and are not part of the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip)]
    pub api_version: Option<ApiVersion>,
    #[serde(skip)]
    pub page: Option<u32>,
    #[serde(skip)]
    pub page_size: Option<u32>,
}

impl PlatformOptions {
    /// Options scoped to a single user.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    /// Page and page size, only when both are present.
    pub fn pagination(&self) -> Option<(u32, u32)> {
        match (self.page, self.page_size) {
            (Some(page), Some(size)) => Some((page, size)),
            _ => None,
        }
    }
}

/// Response of `GET /v1/ping/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PingResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

/// One change record from `GET /v1/memories/:id/history/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformHistoryEntry {
    pub id: String,
    pub memory_id: String,
    /// `ADD`, `UPDATE` or `DELETE`.
    pub event: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub old_memory: Option<String>,
    #[serde(default)]
    pub new_memory: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub input: Option<Vec<Message>>,
}

/// One element of a batch update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdate {
    pub memory_id: String,
    pub text: String,
}

impl BatchUpdate {
    pub fn new(memory_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            memory_id: memory_id.into(),
            text: text.into(),
        }
    }
}

/// Body of `PUT /v1/memories/batch/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateRequest {
    pub memories: Vec<BatchUpdate>,
}

/// Body of `DELETE /v1/memories/batch/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDeleteRequest {
    pub memory_ids: Vec<String>,
}

/// Generic `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub message: String,
}

/// An entity (user, agent, app, run) known to the Platform backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformUser {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub total_memories: Option<u64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Response of `GET /v1/users/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<PlatformUser>,
}
