//! Configuration loading from `~/.unimem/config.toml` with defaults, and
//! construction of a ready router from it.

use crate::local::LocalClient;
use crate::platform::PlatformClient;
use crate::retry::RetryPolicy;
use crate::router::UnifiedMemoryClient;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use unimem_types::config::ClientConfig;
use unimem_types::MemoryResult;

/// Load client configuration from a TOML file, with defaults.
///
/// A missing, unreadable or malformed file never fails: it is logged and
/// the defaults are used.
pub fn load_config(path: Option<&Path>) -> ClientConfig {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);

    if !config_path.exists() {
        info!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
        return ClientConfig::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(contents) => match toml::from_str::<ClientConfig>(&contents) {
            Ok(config) => {
                info!(path = %config_path.display(), "Loaded configuration");
                config
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = %config_path.display(),
                    "Failed to parse config, using defaults"
                );
                ClientConfig::default()
            }
        },
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to read config file, using defaults"
            );
            ClientConfig::default()
        }
    }
}

/// `~/.unimem/config.toml`, or `./.unimem/config.toml` without a home dir.
pub fn default_config_path() -> PathBuf {
    unimem_home().join("config.toml")
}

pub fn unimem_home() -> PathBuf {
    if let Ok(home) = std::env::var("UNIMEM_HOME") {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".unimem")
}

/// An explicit value wins over the named environment variable. Blank values
/// count as unset.
fn resolve_secret(
    explicit: Option<&str>,
    env_var: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    explicit
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .or_else(|| env_var.and_then(|var| lookup(var)))
        .filter(|s| !s.trim().is_empty())
}

impl UnifiedMemoryClient {
    /// Wire both backends from config, reading secrets from the environment.
    pub fn from_config(config: &ClientConfig) -> MemoryResult<Self> {
        Self::from_config_with_env(config, |var| std::env::var(var).ok())
    }

    /// Like [`from_config`](Self::from_config) with a custom environment lookup.
    ///
    /// The Local client is always built. The Platform client is built only
    /// when an API key resolves; without one Platform stays unavailable for
    /// the life of this router.
    pub fn from_config_with_env(
        config: &ClientConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> MemoryResult<Self> {
        let retry = RetryPolicy::from(&config.retry);
        let timeout = Duration::from_secs(config.timeout_secs);

        let token = resolve_secret(
            config.local.token.as_deref(),
            config.local.token_env.as_deref(),
            &lookup,
        );
        let local = LocalClient::from_config(&config.local, token, retry.clone(), timeout)?;

        let mut client = UnifiedMemoryClient::new(config.flags.clone())
            .with_cache_ttl(Duration::from_secs(config.cache_ttl_secs))
            .with_local(local);

        let api_key = resolve_secret(
            config.platform.api_key.as_deref(),
            Some(config.platform.api_key_env.as_str()),
            &lookup,
        );
        match api_key {
            Some(key) => {
                let platform = PlatformClient::from_config(&config.platform, key, retry, timeout)?;
                client = client.with_platform(platform);
            }
            None if config.flags.enable_platform => {
                warn!(
                    env = %config.platform.api_key_env,
                    "Platform enabled but no API key found; platform backend unavailable"
                );
            }
            None => {}
        }
        Ok(client)
    }
}
