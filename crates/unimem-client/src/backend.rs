//! Common interface the router dispatches through.
//!
//! Each adapter converts unified options into its backend's native request
//! shape, calls the domain client and maps the response back to
//! [`UnifiedMemory`].

use crate::local::LocalClient;
use crate::platform::PlatformClient;
use crate::stats::ClientStats;
use crate::transform;
use async_trait::async_trait;
use unimem_types::memory::MemoryPage;
use unimem_types::options::{RequestOptions, SearchOptions};
use unimem_types::{MemoryResult, MemorySource, UnifiedMemory};

/// A memory backend behind the unified schema.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    fn source(&self) -> MemorySource;

    async fn list(&self, options: &RequestOptions) -> MemoryResult<MemoryPage>;

    async fn get(&self, id: &str, options: &RequestOptions) -> MemoryResult<UnifiedMemory>;

    /// Store `text`. Extraction may yield more than one memory.
    async fn create(&self, text: &str, options: &RequestOptions) -> MemoryResult<Vec<UnifiedMemory>>;

    async fn update(
        &self,
        id: &str,
        text: &str,
        options: &RequestOptions,
    ) -> MemoryResult<UnifiedMemory>;

    async fn delete(&self, ids: &[String], options: &RequestOptions) -> MemoryResult<()>;

    async fn search(&self, query: &str, options: &SearchOptions) -> MemoryResult<Vec<UnifiedMemory>>;

    async fn health_check(&self) -> MemoryResult<()>;

    fn stats(&self) -> ClientStats;

    fn reset_stats(&self);
}

#[async_trait]
impl MemoryBackend for LocalClient {
    fn source(&self) -> MemorySource {
        MemorySource::Local
    }

    async fn list(&self, options: &RequestOptions) -> MemoryResult<MemoryPage> {
        let filter = transform::local::to_filter(options, self.default_user());
        let page = self.with_timeout(options.timeout).list(&filter).await?;
        transform::local::page_to_unified(page)
    }

    async fn get(&self, id: &str, options: &RequestOptions) -> MemoryResult<UnifiedMemory> {
        let memory = LocalClient::get(&self.with_timeout(options.timeout), id).await?;
        transform::local::to_unified(memory)
    }

    async fn create(&self, text: &str, options: &RequestOptions) -> MemoryResult<Vec<UnifiedMemory>> {
        let request =
            transform::local::to_create(text, options, self.default_user(), self.default_app());
        let memory = LocalClient::create(&self.with_timeout(options.timeout), &request).await?;
        Ok(vec![transform::local::to_unified(memory)?])
    }

    async fn update(
        &self,
        id: &str,
        text: &str,
        options: &RequestOptions,
    ) -> MemoryResult<UnifiedMemory> {
        let memory = LocalClient::update(
            &self.with_timeout(options.timeout),
            id,
            text,
            options.user_id.as_deref(),
        )
        .await?;
        transform::local::to_unified(memory)
    }

    async fn delete(&self, ids: &[String], options: &RequestOptions) -> MemoryResult<()> {
        self.with_timeout(options.timeout).delete_many(ids).await
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> MemoryResult<Vec<UnifiedMemory>> {
        crate::validate::non_empty("query", query)?;
        let filter = transform::local::to_search_filter(query, options, self.default_user());
        let page = self
            .with_timeout(options.request.timeout)
            .list(&filter)
            .await?;
        Ok(transform::local::page_to_unified(page)?.items)
    }

    async fn health_check(&self) -> MemoryResult<()> {
        LocalClient::health_check(self).await
    }

    fn stats(&self) -> ClientStats {
        self.transport().stats()
    }

    fn reset_stats(&self) {
        self.transport().reset_stats()
    }
}

#[async_trait]
impl MemoryBackend for PlatformClient {
    fn source(&self) -> MemorySource {
        MemorySource::Platform
    }

    async fn list(&self, options: &RequestOptions) -> MemoryResult<MemoryPage> {
        let platform = transform::platform::to_options(options);
        let listing = self
            .with_timeout(options.timeout)
            .get_all(&platform)
            .await?;
        transform::platform::listing_to_page(listing, platform.pagination())
    }

    async fn get(&self, id: &str, options: &RequestOptions) -> MemoryResult<UnifiedMemory> {
        let memory = PlatformClient::get(&self.with_timeout(options.timeout), id).await?;
        transform::platform::to_unified(memory)
    }

    async fn create(&self, text: &str, options: &RequestOptions) -> MemoryResult<Vec<UnifiedMemory>> {
        crate::validate::non_empty("text", text)?;
        let messages = transform::platform::to_messages(text);
        let platform = transform::platform::to_options(options);
        let created = self
            .with_timeout(options.timeout)
            .add(&messages, &platform)
            .await?;
        transform::platform::all_to_unified(created)
    }

    async fn update(
        &self,
        id: &str,
        text: &str,
        options: &RequestOptions,
    ) -> MemoryResult<UnifiedMemory> {
        let memory = PlatformClient::update(&self.with_timeout(options.timeout), id, text).await?;
        transform::platform::to_unified(memory)
    }

    /// One id is a single delete; several go out as one batch request.
    async fn delete(&self, ids: &[String], options: &RequestOptions) -> MemoryResult<()> {
        let client = self.with_timeout(options.timeout);
        match ids {
            [id] => PlatformClient::delete(&client, id).await.map(|_| ()),
            _ => client.batch_delete(ids).await.map(|_| ()),
        }
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> MemoryResult<Vec<UnifiedMemory>> {
        let platform = transform::platform::to_search_options(options);
        let listing = self
            .with_timeout(options.request.timeout)
            .search(query, &platform)
            .await?;
        transform::platform::all_to_unified(listing.into_results())
    }

    async fn health_check(&self) -> MemoryResult<()> {
        PlatformClient::health_check(self).await
    }

    fn stats(&self) -> ClientStats {
        self.transport().stats()
    }

    fn reset_stats(&self) {
        self.transport().reset_stats()
    }
}
