//! Local backend client.
//!
//! Talks to the same-host memory service under `/api/v1/memories`. Every
//! operation validates its input before touching the network and surfaces
//! transport errors unchanged.

use crate::retry::RetryPolicy;
use crate::transport::{Auth, RequestSpec, Transport, TransportConfig};
use crate::validate;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use unimem_types::config::LocalConfig;
use unimem_types::local::{
    LocalCreateRequest, LocalFilterRequest, LocalMemory, LocalPage, LocalStateRequest,
    LocalUpdateRequest,
};
use unimem_types::{MemoryError, MemoryResult, MemoryState};

const MEMORIES: &str = "/api/v1/memories/";
const FILTER: &str = "/api/v1/memories/filter";
const STATE_ACTION: &str = "/api/v1/memories/actions/pause";

/// Domain operations against the Local backend.
#[derive(Clone)]
pub struct LocalClient {
    transport: Arc<Transport>,
    user_id: String,
    app: String,
    timeout: Option<Duration>,
}

impl LocalClient {
    pub fn new(transport: Arc<Transport>, user_id: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            transport,
            user_id: user_id.into(),
            app: app.into(),
            timeout: None,
        }
    }

    /// Build a client and its transport from config.
    pub fn from_config(
        config: &LocalConfig,
        token: Option<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> MemoryResult<Self> {
        let transport = Transport::new(
            TransportConfig::new(&config.base_url, Auth::bearer(token))
                .with_retry(retry)
                .with_timeout(timeout),
        )?;
        info!(base_url = %transport.base_url(), "Local memory client ready");
        Ok(Self::new(Arc::new(transport), &config.user_id, &config.app))
    }

    /// A copy whose requests use `timeout` instead of the transport default.
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// User scoped to when a call names none.
    pub fn default_user(&self) -> &str {
        &self.user_id
    }

    /// App name attached to created memories by default.
    pub fn default_app(&self) -> &str {
        &self.app
    }

    fn spec(&self, spec: RequestSpec) -> RequestSpec {
        spec.with_timeout(self.timeout)
    }

    fn memory_path(id: &str) -> String {
        format!("{MEMORIES}{}", urlencoding::encode(id))
    }

    /// `POST /api/v1/memories/filter`.
    pub async fn list(&self, filter: &LocalFilterRequest) -> MemoryResult<LocalPage> {
        validate::non_empty("user_id", &filter.user_id)?;
        if filter.page == 0 || filter.size == 0 {
            return Err(MemoryError::validation("page and size must be at least 1"));
        }
        let body = serde_json::to_value(filter)?;
        self.transport
            .request(FILTER, self.spec(RequestSpec::post(body)))
            .await
    }

    /// `GET /api/v1/memories/:id`.
    pub async fn get(&self, id: &str) -> MemoryResult<LocalMemory> {
        validate::non_empty("id", id)?;
        self.transport
            .request(&Self::memory_path(id), self.spec(RequestSpec::get()))
            .await
    }

    /// `POST /api/v1/memories/`.
    pub async fn create(&self, request: &LocalCreateRequest) -> MemoryResult<LocalMemory> {
        validate::non_empty("text", &request.text)?;
        validate::non_empty("user_id", &request.user_id)?;
        validate::non_empty("app", &request.app)?;
        let body = serde_json::to_value(request)?;
        self.transport
            .request(MEMORIES, self.spec(RequestSpec::post(body)))
            .await
    }

    /// `PUT /api/v1/memories/:id`.
    pub async fn update(&self, id: &str, text: &str, user_id: Option<&str>) -> MemoryResult<LocalMemory> {
        validate::non_empty("id", id)?;
        validate::non_empty("text", text)?;
        let body = serde_json::to_value(LocalUpdateRequest {
            memory_content: text.to_string(),
            user_id: user_id.unwrap_or(&self.user_id).to_string(),
        })?;
        self.transport
            .request(&Self::memory_path(id), self.spec(RequestSpec::put(body)))
            .await
    }

    /// `DELETE /api/v1/memories/:id`.
    pub async fn delete(&self, id: &str) -> MemoryResult<()> {
        validate::non_empty("id", id)?;
        let _: serde_json::Value = self
            .transport
            .request(&Self::memory_path(id), self.spec(RequestSpec::delete()))
            .await?;
        Ok(())
    }

    /// Delete several memories one request at a time, stopping at the first failure.
    ///
    /// The id list is validated as a whole first.
    pub async fn delete_many(&self, ids: &[String]) -> MemoryResult<()> {
        validate::ids("memory_ids", ids)?;
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }

    /// `POST /api/v1/memories/actions/pause`: move memories to `state`.
    pub async fn set_state(
        &self,
        ids: &[String],
        state: MemoryState,
        user_id: Option<&str>,
    ) -> MemoryResult<()> {
        validate::ids("memory_ids", ids)?;
        let body = serde_json::to_value(LocalStateRequest {
            memory_ids: ids.to_vec(),
            state,
            user_id: user_id.unwrap_or(&self.user_id).to_string(),
        })?;
        let _: serde_json::Value = self
            .transport
            .request(STATE_ACTION, self.spec(RequestSpec::post(body)))
            .await?;
        Ok(())
    }

    pub async fn pause(&self, ids: &[String], user_id: Option<&str>) -> MemoryResult<()> {
        self.set_state(ids, MemoryState::Paused, user_id).await
    }

    /// Cheap reachability probe: one single-item page for the default user.
    pub async fn health_check(&self) -> MemoryResult<()> {
        let mut filter = LocalFilterRequest::for_user(&self.user_id);
        filter.size = 1;
        self.list(&filter).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LocalClient {
        let transport =
            Transport::new(TransportConfig::new("http://127.0.0.1:19996", Auth::None)).unwrap();
        LocalClient::new(Arc::new(transport), "default_user", "unimem")
    }

    #[test]
    fn test_memory_path_encodes_id() {
        assert_eq!(LocalClient::memory_path("abc-1"), "/api/v1/memories/abc-1");
        assert_eq!(LocalClient::memory_path("a/b c"), "/api/v1/memories/a%2Fb%20c");
    }

    #[tokio::test]
    async fn test_validation_before_network() {
        let c = client();
        assert!(c.get("").await.unwrap_err().is_validation());
        assert!(c.delete(" ").await.unwrap_err().is_validation());
        assert!(c.update("id", "", None).await.unwrap_err().is_validation());
        assert!(c.delete_many(&[]).await.unwrap_err().is_validation());
        assert!(c
            .set_state(&["a".into(), "".into()], MemoryState::Archived, None)
            .await
            .unwrap_err()
            .is_validation());
        let mut filter = LocalFilterRequest::for_user("u");
        filter.size = 0;
        assert!(c.list(&filter).await.unwrap_err().is_validation());
        assert_eq!(c.transport().stats().total_requests, 0);
    }

    #[test]
    fn test_with_timeout_keeps_defaults() {
        let c = client().with_timeout(Some(Duration::from_secs(3)));
        assert_eq!(c.default_user(), "default_user");
        assert_eq!(c.default_app(), "unimem");
        assert_eq!(c.timeout, Some(Duration::from_secs(3)));
    }
}
