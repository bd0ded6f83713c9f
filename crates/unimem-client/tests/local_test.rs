//! Local client scenarios against a mock Local server.

use std::sync::Arc;
use unimem_client::transport::{Auth, Transport, TransportConfig};
use unimem_client::LocalClient;
use unimem_types::local::LocalCreateRequest;
use unimem_types::MemoryState;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, token: Option<&str>) -> LocalClient {
    let transport = Transport::new(TransportConfig::new(
        server.uri(),
        Auth::bearer(token.map(str::to_string)),
    ))
    .unwrap();
    LocalClient::new(Arc::new(transport), "default_user", "unimem")
}

#[tokio::test]
async fn test_create_sends_bearer_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/memories/"))
        .and(header("authorization", "Bearer local-secret"))
        .and(body_json(serde_json::json!({
            "user_id": "alice",
            "text": "Moved to Lisbon",
            "infer": false,
            "app": "notes"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "loc-5",
            "content": "Moved to Lisbon",
            "created_at": 1716000000000i64,
            "state": "active"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server, Some("local-secret"))
        .create(&LocalCreateRequest {
            user_id: "alice".into(),
            text: "Moved to Lisbon".into(),
            infer: false,
            app: "notes".into(),
            metadata: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "loc-5");
}

#[tokio::test]
async fn test_pause_posts_state_action() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/memories/actions/pause"))
        .and(body_json(serde_json::json!({
            "memory_ids": ["a", "b"],
            "state": "paused",
            "user_id": "default_user"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/memories/actions/pause"))
        .and(body_json(serde_json::json!({
            "memory_ids": ["c"],
            "state": "archived",
            "user_id": "bob"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server, None);
    c.pause(&["a".to_string(), "b".to_string()], None).await.unwrap();
    c.set_state(&["c".to_string()], MemoryState::Archived, Some("bob"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_many_stops_at_first_failure() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/memories/d1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "detail": "Memory not found"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/memories/d2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, None)
        .delete_many(&["d1".to_string(), "d2".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}
