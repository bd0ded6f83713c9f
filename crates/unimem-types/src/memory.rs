//! Canonical memory types shared by every backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which backend a request targets or a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySource {
    /// Same-host REST memory service.
    Local,
    /// Cloud-hosted memory API (requires an API key).
    Platform,
}

impl MemorySource {
    /// Every source, Local first.
    pub const ALL: [MemorySource; 2] = [MemorySource::Local, MemorySource::Platform];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Platform => "platform",
        }
    }
}

impl std::fmt::Display for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemorySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "openmemory" => Ok(Self::Local),
            "platform" | "cloud" => Ok(Self::Platform),
            other => Err(format!("unknown memory source '{other}'")),
        }
    }
}

/// Lifecycle state of a Local-backend memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryState {
    Active,
    Paused,
    Archived,
    Deleted,
}

impl std::fmt::Display for MemoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// A single conversational message fed to the Platform backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Speaker role (`user`, `assistant`, `system`).
    pub role: String,
    /// Message text.
    pub content: String,
}

impl Message {
    /// A message spoken by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// A message spoken by the assistant.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Canonical, backend-agnostic memory record.
///
/// Backend-specific fields are optional and only populated when the origin
/// backend supplied them. Mapping across backends is lossy by design: a
/// field the origin does not know about stays `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedMemory {
    /// Stable identity assigned by the origin backend.
    pub id: String,
    /// The memory text.
    pub content: String,
    /// Creation instant, millisecond precision.
    ///
    /// Always present. When the origin record had no creation time this holds
    /// the origin's `updated_at`, or for a Platform add event with no
    /// timestamps at all, the time the response was received; see
    /// [`created_at_derived`](Self::created_at_derived).
    pub created_at: DateTime<Utc>,
    /// `created_at` was not reported by the origin backend. Mapping back to
    /// the native shape leaves the creation time out.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub created_at_derived: bool,
    /// Last update instant, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Ordered, de-duplicated category names.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Open metadata map.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Backend the record was read from.
    pub source: MemorySource,

    // Local-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<MemoryState>,

    // Platform-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl UnifiedMemory {
    /// A bare record with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
        source: MemorySource,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created_at,
            created_at_derived: false,
            updated_at: None,
            categories: Vec::new(),
            metadata: HashMap::new(),
            source,
            client: None,
            app_name: None,
            state: None,
            user_id: None,
            agent_id: None,
            app_id: None,
            run_id: None,
            messages: None,
            score: None,
            hash: None,
            memory_type: None,
            owner: None,
        }
    }
}

/// One page of canonical memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPage {
    pub items: Vec<UnifiedMemory>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

impl MemoryPage {
    /// Wrap an unpaginated list as a single page.
    pub fn single(items: Vec<UnifiedMemory>) -> Self {
        let len = items.len();
        Self {
            total: len as u64,
            page: 1,
            size: len as u32,
            pages: if len == 0 { 0 } else { 1 },
            items,
        }
    }
}

/// A router result tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedResult<T> {
    /// Backend that actually served the call.
    pub source: MemorySource,
    /// True when the requested backend failed and this came from the fallback.
    #[serde(default)]
    pub fell_back: bool,
    /// The payload.
    pub data: T,
}

impl<T> SourcedResult<T> {
    /// Map the payload, keeping the source tag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SourcedResult<U> {
        SourcedResult {
            source: self.source,
            fell_back: self.fell_back,
            data: f(self.data),
        }
    }
}
