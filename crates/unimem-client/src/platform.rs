//! Platform (cloud) backend client.
//!
//! Authenticates with `Authorization: Token <api key>`. The first `add` on a
//! client runs an identity check against `/v1/ping/`; the result is shared by
//! every clone of that client.

use crate::retry::RetryPolicy;
use crate::transport::{Auth, RequestSpec, Transport, TransportConfig};
use crate::validate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use unimem_types::config::PlatformConfig;
use unimem_types::platform::{
    ActionResponse, ApiVersion, BatchDeleteRequest, BatchUpdate, BatchUpdateRequest,
    PingResponse, PlatformHistoryEntry, PlatformListing, PlatformMemory, PlatformOptions,
    UsersResponse,
};
use unimem_types::{MemoryError, MemoryResult, Message};

const PING: &str = "/v1/ping/";
const MEMORIES_V1: &str = "/v1/memories/";
const MEMORIES_V2: &str = "/v2/memories/";
const SEARCH_V1: &str = "/v1/memories/search/";
const SEARCH_V2: &str = "/v2/memories/search/";
const BATCH: &str = "/v1/memories/batch/";
const USERS: &str = "/v1/users/";

/// Domain operations against the Platform backend.
#[derive(Clone)]
pub struct PlatformClient {
    transport: Arc<Transport>,
    org_id: Option<String>,
    project_id: Option<String>,
    identity: Arc<OnceCell<PingResponse>>,
    timeout: Option<Duration>,
}

impl PlatformClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            org_id: None,
            project_id: None,
            identity: Arc::new(OnceCell::new()),
            timeout: None,
        }
    }

    /// Scope every call to an organization and project.
    pub fn with_scope(mut self, org_id: Option<String>, project_id: Option<String>) -> Self {
        self.org_id = org_id;
        self.project_id = project_id;
        self
    }

    /// Build a client and its transport from config and a resolved API key.
    pub fn from_config(
        config: &PlatformConfig,
        api_key: String,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> MemoryResult<Self> {
        if api_key.trim().is_empty() {
            return Err(MemoryError::Config("Platform API key is empty".to_string()));
        }
        let transport = Transport::new(
            TransportConfig::new(&config.base_url, Auth::token(api_key))
                .with_retry(retry)
                .with_timeout(timeout),
        )?;
        info!(base_url = %transport.base_url(), "Platform memory client ready");
        Ok(Self::new(Arc::new(transport))
            .with_scope(config.org_id.clone(), config.project_id.clone()))
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

    /// Identity cached by the first successful check, if any.
    pub fn identity(&self) -> Option<&PingResponse> {
        self.identity.get()
    }

    fn spec(&self, spec: RequestSpec) -> RequestSpec {
        spec.with_timeout(self.timeout)
    }

    fn memory_path(id: &str) -> String {
        format!("{MEMORIES_V1}{}/", urlencoding::encode(id))
    }

    /// Configured org/project ids, else the ones reported by the identity check.
    fn scope(&self) -> (Option<String>, Option<String>) {
        let identity = self.identity.get();
        let org = self
            .org_id
            .clone()
            .or_else(|| identity.and_then(|i| i.org_id.clone()));
        let project = self
            .project_id
            .clone()
            .or_else(|| identity.and_then(|i| i.project_id.clone()));
        (org, project)
    }

    fn scoped(&self, options: &PlatformOptions) -> PlatformOptions {
        let (org, project) = self.scope();
        let mut scoped = options.clone();
        if scoped.org_id.is_none() {
            scoped.org_id = org;
        }
        if scoped.project_id.is_none() {
            scoped.project_id = project;
        }
        scoped
    }

    fn scope_params(&self) -> Vec<(String, String)> {
        let (org, project) = self.scope();
        let mut params = Vec::new();
        if let Some(org) = org {
            params.push(("org_id".to_string(), org));
        }
        if let Some(project) = project {
            params.push(("project_id".to_string(), project));
        }
        params
    }

    /// `GET /v1/ping/`. Always hits the network.
    pub async fn ping(&self) -> MemoryResult<PingResponse> {
        self.transport
            .request(PING, self.spec(RequestSpec::get()))
            .await
    }

    /// Identity check run once per client; later calls reuse the cached result.
    async fn ensure_identity(&self) -> MemoryResult<&PingResponse> {
        self.identity
            .get_or_try_init(|| async {
                let identity = self.ping().await?;
                debug!(
                    org_id = ?identity.org_id,
                    project_id = ?identity.project_id,
                    "Platform identity verified"
                );
                Ok(identity)
            })
            .await
    }

    /// `POST /v1/memories/` with the conversation and non-null options.
    pub async fn add(
        &self,
        messages: &[Message],
        options: &PlatformOptions,
    ) -> MemoryResult<Vec<PlatformMemory>> {
        validate::messages(messages)?;
        self.ensure_identity().await?;

        let mut body = serde_json::to_value(self.scoped(options))?;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("messages".to_string(), serde_json::to_value(messages)?);
        }
        let listing: PlatformListing = self
            .transport
            .request(MEMORIES_V1, self.spec(RequestSpec::post(body)))
            .await?;
        Ok(listing.into_results())
    }

    /// `GET /v1/memories/:id/`.
    pub async fn get(&self, id: &str) -> MemoryResult<PlatformMemory> {
        validate::non_empty("id", id)?;
        self.transport
            .request(&Self::memory_path(id), self.spec(RequestSpec::get()))
            .await
    }

    /// List memories. v1 sends options as query params, v2 as a JSON body.
    pub async fn get_all(&self, options: &PlatformOptions) -> MemoryResult<PlatformListing> {
        let endpoint = match options.api_version.unwrap_or_default() {
            ApiVersion::V1 => MEMORIES_V1,
            ApiVersion::V2 => MEMORIES_V2,
        };
        let spec = self.listing_spec(self.scoped(options), None)?;
        self.transport.request(endpoint, spec).await
    }

    /// Semantic search. Same v1/v2 split as [`get_all`](Self::get_all).
    pub async fn search(
        &self,
        query: &str,
        options: &PlatformOptions,
    ) -> MemoryResult<PlatformListing> {
        validate::non_empty("query", query)?;
        let endpoint = match options.api_version.unwrap_or_default() {
            ApiVersion::V1 => SEARCH_V1,
            ApiVersion::V2 => SEARCH_V2,
        };
        let spec = self.listing_spec(self.scoped(options), Some(query))?;
        self.transport.request(endpoint, spec).await
    }

    fn listing_spec(&self, options: PlatformOptions, query: Option<&str>) -> MemoryResult<RequestSpec> {
        let spec = match options.api_version.unwrap_or_default() {
            ApiVersion::V1 => {
                let mut params = query_params(&options)?;
                if let Some(query) = query {
                    params.push(("query".to_string(), query.to_string()));
                }
                RequestSpec::get().with_params(params)
            }
            ApiVersion::V2 => {
                let mut body = serde_json::to_value(&options)?;
                if let (Some(query), Some(obj)) = (query, body.as_object_mut()) {
                    obj.insert("query".to_string(), serde_json::Value::from(query));
                }
                RequestSpec::post(body)
            }
        };
        let spec = match options.pagination() {
            Some((page, size)) => spec
                .with_param("page", page.to_string())
                .with_param("page_size", size.to_string()),
            None => spec,
        };
        Ok(self.spec(spec))
    }

    /// `PUT /v1/memories/:id/`.
    pub async fn update(&self, id: &str, text: &str) -> MemoryResult<PlatformMemory> {
        validate::non_empty("id", id)?;
        validate::non_empty("text", text)?;
        let body = serde_json::json!({ "text": text });
        self.transport
            .request(&Self::memory_path(id), self.spec(RequestSpec::put(body)))
            .await
    }

    /// `DELETE /v1/memories/:id/`.
    pub async fn delete(&self, id: &str) -> MemoryResult<ActionResponse> {
        validate::non_empty("id", id)?;
        let resp: Option<ActionResponse> = self
            .transport
            .request(&Self::memory_path(id), self.spec(RequestSpec::delete()))
            .await?;
        Ok(resp.unwrap_or_default())
    }

    /// `DELETE /v1/memories/?user_id=…`: every memory of one user.
    pub async fn delete_all(&self, user_id: &str) -> MemoryResult<ActionResponse> {
        validate::non_empty("user_id", user_id)?;
        let spec = RequestSpec::delete()
            .with_param("user_id", user_id)
            .with_params(self.scope_params());
        let resp: Option<ActionResponse> = self
            .transport
            .request(MEMORIES_V1, self.spec(spec))
            .await?;
        Ok(resp.unwrap_or_default())
    }

    /// `GET /v1/memories/:id/history/`, oldest change first.
    pub async fn history(&self, id: &str) -> MemoryResult<Vec<PlatformHistoryEntry>> {
        validate::non_empty("id", id)?;
        let path = format!("{}history/", Self::memory_path(id));
        let mut entries: Vec<PlatformHistoryEntry> = self
            .transport
            .request(&path, self.spec(RequestSpec::get()))
            .await?;
        entries.sort_by_cached_key(|e| crate::transform::parse_iso(&e.created_at).ok());
        Ok(entries)
    }

    /// `PUT /v1/memories/batch/`: one request for the whole batch.
    pub async fn batch_update(&self, updates: &[BatchUpdate]) -> MemoryResult<ActionResponse> {
        validate::batch_updates(updates)?;
        let body = serde_json::to_value(BatchUpdateRequest {
            memories: updates.to_vec(),
        })?;
        let resp: Option<ActionResponse> = self
            .transport
            .request(BATCH, self.spec(RequestSpec::put(body)))
            .await?;
        Ok(resp.unwrap_or_default())
    }

    /// `DELETE /v1/memories/batch/`: one request for the whole batch.
    pub async fn batch_delete(&self, ids: &[String]) -> MemoryResult<ActionResponse> {
        validate::ids("memory_ids", ids)?;
        let body = serde_json::to_value(BatchDeleteRequest {
            memory_ids: ids.to_vec(),
        })?;
        let spec = RequestSpec::delete().with_body(body);
        let resp: Option<ActionResponse> = self
            .transport
            .request(BATCH, self.spec(spec))
            .await?;
        Ok(resp.unwrap_or_default())
    }

    /// `GET /v1/users/`.
    pub async fn users(&self) -> MemoryResult<UsersResponse> {
        let spec = RequestSpec::get().with_params(self.scope_params());
        self.transport.request(USERS, self.spec(spec)).await
    }

    /// `DELETE /v1/users/`, optionally narrowed to one user.
    pub async fn delete_users(&self, user_id: Option<&str>) -> MemoryResult<ActionResponse> {
        let mut spec = RequestSpec::delete();
        if let Some(user_id) = user_id {
            validate::non_empty("user_id", user_id)?;
            spec = spec.with_param("user_id", user_id);
        }
        let spec = spec.with_params(self.scope_params());
        let resp: Option<ActionResponse> = self
            .transport
            .request(USERS, self.spec(spec))
            .await?;
        Ok(resp.unwrap_or_default())
    }

    /// Reachability probe. Unlike the lazy identity check this always pings.
    pub async fn health_check(&self) -> MemoryResult<()> {
        self.ping().await.map(|_| ())
    }
}

/// Flatten options into v1 query params.
///
/// Strings pass through, numbers and booleans are formatted, string arrays
/// are comma-joined and anything else is sent as compact JSON.
fn query_params(options: &PlatformOptions) -> MemoryResult<Vec<(String, String)>> {
    let value = serde_json::to_value(options)?;
    let Some(obj) = value.as_object() else {
        return Ok(Vec::new());
    };
    let params = obj
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let rendered = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(_) | serde_json::Value::Bool(_) => v.to_string(),
                serde_json::Value::Array(items) if items.iter().all(|i| i.is_string()) => items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                other => other.to_string(),
            };
            (k.clone(), rendered)
        })
        .collect();
    Ok(params)
}
