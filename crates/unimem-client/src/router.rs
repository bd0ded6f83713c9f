//! Unified router: one API over both backends.
//!
//! Each call snapshots the feature flags once, resolves its backend
//! (explicit option, else `default_source`), dispatches through
//! [`MemoryBackend`] and, when allowed, retries a failed non-Local call
//! against Local.

use crate::backend::MemoryBackend;
use crate::cache::MemoryCache;
use crate::flags::FeatureFlagStore;
use crate::local::LocalClient;
use crate::platform::PlatformClient;
use crate::stats::ClientStats;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use unimem_types::config::{FeatureFlags, FeatureFlagsUpdate};
use unimem_types::memory::MemoryPage;
use unimem_types::options::{RequestOptions, SearchOptions};
use unimem_types::{MemoryError, MemoryResult, MemorySource, SourcedResult, UnifiedMemory};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Health of one backend as seen by [`UnifiedMemoryClient::health_check`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendHealth {
    pub source: MemorySource,
    pub available: bool,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Single entry point over the Local and Platform backends.
pub struct UnifiedMemoryClient {
    local: Option<Arc<LocalClient>>,
    platform: Option<Arc<PlatformClient>>,
    flags: FeatureFlagStore,
    cache: MemoryCache,
}

impl UnifiedMemoryClient {
    /// A router with no backends wired yet.
    pub fn new(flags: FeatureFlags) -> Self {
        Self {
            local: None,
            platform: None,
            flags: FeatureFlagStore::new(flags),
            cache: MemoryCache::new(DEFAULT_CACHE_TTL),
        }
    }

    pub fn with_local(mut self, client: LocalClient) -> Self {
        self.local = Some(Arc::new(client));
        self
    }

    pub fn with_platform(mut self, client: PlatformClient) -> Self {
        self.platform = Some(Arc::new(client));
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = MemoryCache::new(ttl);
        self
    }

    pub fn local(&self) -> Option<&LocalClient> {
        self.local.as_deref()
    }

    pub fn platform(&self) -> Option<&PlatformClient> {
        self.platform.as_deref()
    }

    // -- Flags ---------------------------------------------------------------

    pub fn feature_flags(&self) -> FeatureFlags {
        self.flags.snapshot()
    }

    /// Apply a partial flag update. Calls already in flight keep their snapshot.
    pub fn update_feature_flags(&self, update: &FeatureFlagsUpdate) -> FeatureFlags {
        let flags = self.flags.update(update);
        if update.enable_caching == Some(false) {
            self.cache.clear();
        }
        for source in MemorySource::ALL {
            if !flags.is_enabled(source) {
                self.cache.forget_source(source);
            }
        }
        flags
    }

    /// Local needs its flag; Platform needs its flag and a client built at startup.
    pub fn is_source_available(&self, source: MemorySource) -> bool {
        self.backend_for(source, &self.flags.snapshot()).is_some()
    }

    pub fn available_sources(&self) -> Vec<MemorySource> {
        let flags = self.flags.snapshot();
        MemorySource::ALL
            .into_iter()
            .filter(|s| self.backend_for(*s, &flags).is_some())
            .collect()
    }

    fn backend_for(&self, source: MemorySource, flags: &FeatureFlags) -> Option<Arc<dyn MemoryBackend>> {
        if !flags.is_enabled(source) {
            return None;
        }
        match source {
            MemorySource::Local => self
                .local
                .as_ref()
                .map(|c| Arc::clone(c) as Arc<dyn MemoryBackend>),
            MemorySource::Platform => self
                .platform
                .as_ref()
                .map(|c| Arc::clone(c) as Arc<dyn MemoryBackend>),
        }
    }

    fn unavailable(&self, source: MemorySource, flags: &FeatureFlags) -> MemoryError {
        let reason = if !flags.is_enabled(source) {
            format!("{source} backend is disabled")
        } else {
            format!("{source} backend is not configured")
        };
        MemoryError::UnavailableSource {
            backend: source,
            reason,
        }
    }

    // -- Dispatch ------------------------------------------------------------

    async fn route<'a, T, F>(
        &self,
        operation: &'static str,
        flags: &FeatureFlags,
        requested: Option<MemorySource>,
        call: F,
    ) -> MemoryResult<SourcedResult<T>>
    where
        T: Send,
        F: Fn(Arc<dyn MemoryBackend>) -> BoxFuture<'a, MemoryResult<T>> + Send + Sync,
    {
        let source = requested.unwrap_or(flags.default_source);
        let started = Instant::now();

        let primary = match self.backend_for(source, flags) {
            Some(backend) => call(backend).await,
            None => Err(self.unavailable(source, flags)),
        };
        let err = match primary {
            Ok(data) => {
                telemetry(flags, operation, source, false, true, started);
                return Ok(SourcedResult {
                    source,
                    fell_back: false,
                    data,
                });
            }
            Err(err) => err,
        };

        let fallback = if err.is_validation() || !flags.enable_auto_fallback || source == MemorySource::Local {
            None
        } else {
            self.backend_for(MemorySource::Local, flags)
        };
        let Some(local) = fallback else {
            telemetry(flags, operation, source, false, false, started);
            return Err(err);
        };

        warn!(operation, from = %source, error = %err, "Falling back to local backend");
        let result = call(local).await;
        telemetry(flags, operation, MemorySource::Local, true, result.is_ok(), started);
        Ok(SourcedResult {
            source: MemorySource::Local,
            fell_back: true,
            data: result?,
        })
    }

    // -- Operations ----------------------------------------------------------

    pub async fn get_memories(&self, options: &RequestOptions) -> MemoryResult<SourcedResult<MemoryPage>> {
        let flags = self.flags.snapshot();
        self.route("get_memories", &flags, options.source, |b| {
            Box::pin(async move { b.list(options).await })
        })
        .await
    }

    /// Fetch one memory. Served from the read cache when caching is on.
    pub async fn get_memory_by_id(
        &self,
        id: &str,
        options: &RequestOptions,
    ) -> MemoryResult<SourcedResult<UnifiedMemory>> {
        let flags = self.flags.snapshot();
        let source = options.source.unwrap_or(flags.default_source);
        if flags.enable_caching && self.backend_for(source, &flags).is_some() {
            if let Some(memory) = self.cache.lookup(source, id) {
                return Ok(SourcedResult {
                    source,
                    fell_back: false,
                    data: memory,
                });
            }
        }

        let result = self
            .route("get_memory_by_id", &flags, options.source, |b| {
                Box::pin(async move { b.get(id, options).await })
            })
            .await?;
        if flags.enable_caching {
            self.cache.store(result.source, result.data.clone());
        }
        Ok(result)
    }

    pub async fn create_memory(
        &self,
        text: &str,
        options: &RequestOptions,
    ) -> MemoryResult<SourcedResult<Vec<UnifiedMemory>>> {
        let flags = self.flags.snapshot();
        self.route("create_memory", &flags, options.source, |b| {
            Box::pin(async move { b.create(text, options).await })
        })
        .await
    }

    pub async fn update_memory(
        &self,
        id: &str,
        text: &str,
        options: &RequestOptions,
    ) -> MemoryResult<SourcedResult<UnifiedMemory>> {
        let flags = self.flags.snapshot();
        let result = self
            .route("update_memory", &flags, options.source, |b| {
                Box::pin(async move { b.update(id, text, options).await })
            })
            .await?;
        self.cache.forget(result.source, &[id.to_string()]);
        Ok(result)
    }

    pub async fn delete_memories(
        &self,
        ids: &[String],
        options: &RequestOptions,
    ) -> MemoryResult<SourcedResult<()>> {
        let flags = self.flags.snapshot();
        let result = self
            .route("delete_memories", &flags, options.source, |b| {
                Box::pin(async move { b.delete(ids, options).await })
            })
            .await;
        // A failed multi-delete may still have removed a prefix of `ids`.
        self.cache.forget_everywhere(ids);
        result
    }

    pub async fn search_memories(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> MemoryResult<SourcedResult<Vec<UnifiedMemory>>> {
        let flags = self.flags.snapshot();
        self.route("search_memories", &flags, options.request.source, |b| {
            Box::pin(async move { b.search(query, options).await })
        })
        .await
    }

    // -- Introspection -------------------------------------------------------

    /// Transport stats of one backend, if it was constructed.
    pub fn stats(&self, source: MemorySource) -> Option<ClientStats> {
        match source {
            MemorySource::Local => self.local.as_ref().map(|c| MemoryBackend::stats(c.as_ref())),
            MemorySource::Platform => self
                .platform
                .as_ref()
                .map(|c| MemoryBackend::stats(c.as_ref())),
        }
    }

    pub fn reset_stats(&self) {
        if let Some(c) = &self.local {
            MemoryBackend::reset_stats(c.as_ref());
        }
        if let Some(c) = &self.platform {
            MemoryBackend::reset_stats(c.as_ref());
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Probe every constructed backend, available or not.
    pub async fn health_check(&self) -> Vec<BackendHealth> {
        let flags = self.flags.snapshot();
        let mut report = Vec::new();
        let backends = [
            self.local.as_ref().map(|c| Arc::clone(c) as Arc<dyn MemoryBackend>),
            self.platform
                .as_ref()
                .map(|c| Arc::clone(c) as Arc<dyn MemoryBackend>),
        ];
        for backend in backends.into_iter().flatten() {
            let source = backend.source();
            let outcome = backend.health_check().await;
            report.push(BackendHealth {
                source,
                available: flags.is_enabled(source),
                healthy: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
            });
        }
        report
    }
}

fn telemetry(
    flags: &FeatureFlags,
    operation: &'static str,
    source: MemorySource,
    fell_back: bool,
    success: bool,
    started: Instant,
) {
    if flags.enable_telemetry {
        info!(
            target: "unimem::telemetry",
            operation,
            source = %source,
            fell_back,
            success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "memory operation"
        );
    }
}
