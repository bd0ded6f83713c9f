//! Client configuration and feature flags.
//!
//! Everything here deserializes from TOML with `#[serde(default)]`, so a
//! partial (or empty) config file yields working defaults.

use crate::memory::MemorySource;
use serde::{Deserialize, Serialize};

/// Default Local backend URL.
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:8765";
/// Default Platform backend URL.
pub const DEFAULT_PLATFORM_URL: &str = "https://api.mem0.ai";
/// Default environment variable holding the Platform API key.
pub const DEFAULT_PLATFORM_KEY_ENV: &str = "UNIMEM_PLATFORM_API_KEY";
/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Runtime switches that decide which backend serves a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub enable_local: bool,
    pub enable_platform: bool,
    /// Backend used when a call does not name one.
    pub default_source: MemorySource,
    /// Retry failed non-Local calls against Local.
    pub enable_auto_fallback: bool,
    /// Cache single-record reads.
    pub enable_caching: bool,
    /// Emit per-operation telemetry events.
    pub enable_telemetry: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_local: true,
            enable_platform: false,
            default_source: MemorySource::Local,
            enable_auto_fallback: true,
            enable_caching: false,
            enable_telemetry: false,
        }
    }
}

impl FeatureFlags {
    /// Whether the flag for `source` is switched on.
    pub fn is_enabled(&self, source: MemorySource) -> bool {
        match source {
            MemorySource::Local => self.enable_local,
            MemorySource::Platform => self.enable_platform,
        }
    }
}

/// Partial update applied by `update_feature_flags`. `None` leaves a flag as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlagsUpdate {
    pub enable_local: Option<bool>,
    pub enable_platform: Option<bool>,
    pub default_source: Option<MemorySource>,
    pub enable_auto_fallback: Option<bool>,
    pub enable_caching: Option<bool>,
    pub enable_telemetry: Option<bool>,
}

impl FeatureFlagsUpdate {
    /// Apply the set fields onto `flags`.
    pub fn apply(&self, flags: &mut FeatureFlags) {
        if let Some(v) = self.enable_local {
            flags.enable_local = v;
        }
        if let Some(v) = self.enable_platform {
            flags.enable_platform = v;
        }
        if let Some(v) = self.default_source {
            flags.default_source = v;
        }
        if let Some(v) = self.enable_auto_fallback {
            flags.enable_auto_fallback = v;
        }
        if let Some(v) = self.enable_caching {
            flags.enable_caching = v;
        }
        if let Some(v) = self.enable_telemetry {
            flags.enable_telemetry = v;
        }
    }
}

/// Retry policy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Base backoff delay in milliseconds.
    pub delay_ms: u64,
    /// Backoff cap in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter factor (0.0 = deterministic).
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter: 0.0,
        }
    }
}

/// Local backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub base_url: String,
    /// Optional bearer token.
    pub token: Option<String>,
    /// Environment variable to read the bearer token from.
    pub token_env: Option<String>,
    /// User the Local backend scopes calls to when the caller names none.
    pub user_id: String,
    /// App name attached to created memories.
    pub app: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LOCAL_URL.to_string(),
            token: None,
            token_env: None,
            user_id: "default_user".to_string(),
            app: "unimem".to_string(),
        }
    }
}

/// Platform backend connection settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub base_url: String,
    /// API key. Prefer `api_key_env` over writing keys into files.
    pub api_key: Option<String>,
    /// Environment variable to read the API key from.
    pub api_key_env: String,
    pub org_id: Option<String>,
    pub project_id: Option<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PLATFORM_URL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_PLATFORM_KEY_ENV.to_string(),
            org_id: None,
            project_id: None,
        }
    }
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("org_id", &self.org_id)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub local: LocalConfig,
    pub platform: PlatformConfig,
    pub retry: RetrySettings,
    pub flags: FeatureFlags,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// TTL of the read cache in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            local: LocalConfig::default(),
            platform: PlatformConfig::default(),
            retry: RetrySettings::default(),
            flags: FeatureFlags::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_ttl_secs: 60,
        }
    }
}
