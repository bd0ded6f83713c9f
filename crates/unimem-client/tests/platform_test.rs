//! Platform client scenarios against a mock Platform API.

use std::sync::Arc;
use std::time::Duration;
use unimem_client::retry::RetryPolicy;
use unimem_client::transport::{Auth, Transport, TransportConfig};
use unimem_client::PlatformClient;
use unimem_types::platform::{ApiVersion, BatchUpdate, PlatformListing, PlatformOptions};
use unimem_types::Message;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> PlatformClient {
    let transport = Transport::new(
        TransportConfig::new(server.uri(), Auth::token("m0-test".into()))
            .with_retry(RetryPolicy {
                max_attempts: 2,
                base_delay_ms: 1,
                max_delay_ms: 5,
                jitter: 0.0,
            })
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap();
    PlatformClient::new(Arc::new(transport))
}

async fn mount_ping(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/ping/"))
        .and(header("authorization", "Token m0-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "org_id": "org-7",
            "project_id": "proj-3",
            "user_email": "dev@example.com"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_add_returns_memories_for_user() {
    let server = MockServer::start().await;
    mount_ping(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/v1/memories/"))
        .and(body_json(serde_json::json!({
            "messages": [{"role": "user", "content": "I love coffee"}],
            "user_id": "alice",
            "org_id": "org-7",
            "project_id": "proj-3"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "mem-1",
                "data": {"memory": "Loves coffee"},
                "event": "ADD",
                "user_id": "alice"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    let added = c
        .add(
            &[Message::user("I love coffee")],
            &PlatformOptions::for_user("alice"),
        )
        .await
        .unwrap();
    assert!(!added.is_empty());
    assert_eq!(added[0].user_id.as_deref(), Some("alice"));
    assert_eq!(added[0].text(), Some("Loves coffee"));
}

#[tokio::test]
async fn test_identity_check_runs_once_across_clones() {
    let server = MockServer::start().await;
    mount_ping(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/v1/memories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{"id": "m", "memory": "x", "event": "ADD"}]
        })))
        .expect(3)
        .mount(&server)
        .await;

    let c = client(&server);
    let opts = PlatformOptions::for_user("bob");
    c.add(&[Message::user("one")], &opts).await.unwrap();
    c.add(&[Message::user("two")], &opts).await.unwrap();
    c.with_timeout(Some(Duration::from_secs(1)))
        .add(&[Message::user("three")], &opts)
        .await
        .unwrap();
    assert_eq!(c.identity().and_then(|i| i.org_id.as_deref()), Some("org-7"));
}

#[tokio::test]
async fn test_failed_identity_check_blocks_add() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ping/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "detail": "Invalid API key"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/memories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .add(&[Message::user("hi")], &PlatformOptions::for_user("alice"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_batch_delete_is_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/memories/batch/"))
        .and(body_json(serde_json::json!({"memory_ids": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Successfully deleted 2 memories"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client(&server)
        .batch_delete(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert!(resp.message.contains("2 memories"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_batch_update_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/memories/batch/"))
        .and(body_json(serde_json::json!({
            "memories": [
                {"memory_id": "a", "text": "new a"},
                {"memory_id": "b", "text": "new b"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .batch_update(&[BatchUpdate::new("a", "new a"), BatchUpdate::new("b", "new b")])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_all_v1_uses_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/memories/"))
        .and(query_param("user_id", "alice"))
        .and(query_param("categories", "food,travel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "m1", "memory": "Loves espresso", "created_at": "2024-07-20T10:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut opts = PlatformOptions::for_user("alice");
    opts.categories = Some(vec!["food".into(), "travel".into()]);
    let listing = client(&server).get_all(&opts).await.unwrap();
    assert!(matches!(listing, PlatformListing::List(ref v) if v.len() == 1));
}

#[tokio::test]
async fn test_get_all_v2_paginated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/memories/"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "10"))
        .and(body_json(serde_json::json!({"user_id": "alice"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 25,
            "next": null,
            "previous": null,
            "results": [{"id": "m11", "memory": "x", "created_at": "2024-07-20T10:00:00Z"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut opts = PlatformOptions::for_user("alice");
    opts.api_version = Some(ApiVersion::V2);
    opts.page = Some(2);
    opts.page_size = Some(10);
    match client(&server).get_all(&opts).await.unwrap() {
        PlatformListing::Paginated { count, results, .. } => {
            assert_eq!(count, 25);
            assert_eq!(results[0].id, "m11");
        }
        other => panic!("expected paginated listing, got {other:?}"),
    }
}

#[tokio::test]
async fn test_search_v1_and_v2_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/memories/search/"))
        .and(query_param("query", "coffee"))
        .and(query_param("top_k", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/memories/search/"))
        .and(body_json(serde_json::json!({
            "query": "coffee",
            "filters": {"AND": [{"user_id": "alice"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    let v1 = PlatformOptions {
        top_k: Some(3),
        ..Default::default()
    };
    c.search("coffee", &v1).await.unwrap();

    let v2 = PlatformOptions {
        filters: Some(serde_json::json!({"AND": [{"user_id": "alice"}]})),
        api_version: Some(ApiVersion::V2),
        ..Default::default()
    };
    c.search("coffee", &v2).await.unwrap();
}

#[tokio::test]
async fn test_history_sorted_oldest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/memories/m1/history/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "h2", "memory_id": "m1", "event": "UPDATE",
             "created_at": "2024-07-21T09:00:00Z", "old_memory": "Likes tea", "new_memory": "Loves tea"},
            {"id": "h1", "memory_id": "m1", "event": "ADD",
             "created_at": "2024-07-20T09:00:00Z", "new_memory": "Likes tea"}
        ])))
        .mount(&server)
        .await;

    let history = client(&server).history("m1").await.unwrap();
    let ids: Vec<&str> = history.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["h1", "h2"]);
}

#[tokio::test]
async fn test_update_delete_and_delete_all() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/memories/m1/"))
        .and(body_json(serde_json::json!({"text": "Prefers green tea"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "m1", "memory": "Prefers green tea",
            "created_at": "2024-07-20T09:00:00Z", "updated_at": "2024-07-22T09:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/memories/m1/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/memories/"))
        .and(query_param("user_id", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Memories deleted successfully!"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    let updated = c.update("m1", "Prefers green tea").await.unwrap();
    assert_eq!(updated.text(), Some("Prefers green tea"));
    let deleted = c.delete("m1").await.unwrap();
    assert!(deleted.message.is_empty());
    let all = c.delete_all("alice").await.unwrap();
    assert!(all.message.contains("deleted"));
}

#[tokio::test]
async fn test_users_scoped_to_org() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/"))
        .and(query_param("org_id", "org-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "results": [{"id": "u1", "name": "alice", "type": "user", "total_memories": 4}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/users/"))
        .and(query_param("user_id", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Entity deleted successfully."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server).with_scope(Some("org-1".into()), None);
    let users = c.users().await.unwrap();
    assert_eq!(users.count, 1);
    assert_eq!(users.results[0].kind.as_deref(), Some("user"));
    assert_eq!(users.results[0].total_memories, Some(4));
    c.delete_users(Some("alice")).await.unwrap();
}
