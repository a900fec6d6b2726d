use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::time::timeout;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use statusblog::prelude::*;
use statusblog::realtime::SyncChannel;
use statusblog::store::OrderBy;

fn store_for(server: &MockServer) -> RestStore {
    let config = StoreConfig::new(&server.uri(), "test-key").unwrap();
    let options = ClientOptions::default().with_poll_interval(Duration::from_millis(20));
    RestStore::new(config, &options)
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn create_posts_row_and_returns_its_id() {
    let mock_server = MockServer::start().await;
    let body = json!({
        "title": "Hi",
        "text": "World",
        "image": "",
        "createdAt": "2024-01-01T00:00:00.000Z"
    });

    Mock::given(method("POST"))
        .and(path("/rest/v1/posts"))
        .and(header("apikey", "test-key"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": 12, "title": "Hi", "text": "World", "image": "", "createdAt": "2024-01-01T00:00:00.000Z" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let id = store.create("posts", fields(body)).await.unwrap();

    assert_eq!(id, "12");
}

#[tokio::test]
async fn update_patches_by_id() {
    let mock_server = MockServer::start().await;
    let body = json!({ "title": "CPU", "value": 30.0, "type": "radial", "colors": ["#0f0"], "side": "left" });

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/gauges"))
        .and(query_param("id", "eq.g1"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "g1", "title": "CPU", "value": 30.0, "type": "radial", "colors": ["#0f0"], "side": "left", "createdAt": "2024-01-01T00:00:00.000Z" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    store.update("gauges", "g1", fields(body)).await.unwrap();
}

#[tokio::test]
async fn update_matching_no_row_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/gauges"))
        .and(query_param("id", "eq.gone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let error = store
        .update("gauges", "gone", fields(json!({ "title": "CPU" })))
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Store(_)));
}

#[tokio::test]
async fn delete_targets_one_row() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/posts"))
        .and(query_param("id", "eq.p1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    store.delete("posts", "p1").await.unwrap();
}

#[tokio::test]
async fn error_status_becomes_store_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/posts"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let error = store.delete("posts", "p1").await.unwrap_err();

    assert!(matches!(error, Error::Store(_)));
    assert!(error.to_string().contains("401"));
    assert!(error.is_remote());
}

#[tokio::test]
async fn polling_subscription_feeds_sync_channel() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(query_param("select", "*"))
        .and(query_param("order", "createdAt.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "b", "title": "Newer", "text": "2", "image": "", "createdAt": "2024-02-01T00:00:00.000Z" },
            { "id": "a", "title": "Older", "text": "1", "createdAt": "2024-01-01T00:00:00.000Z" }
        ])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let mut channel = SyncChannel::<Post>::open(&store, "posts", OrderBy::desc("createdAt"))
        .await
        .unwrap();

    let posts = timeout(Duration::from_secs(5), channel.ready())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, "b");
    assert_eq!(posts[1].title, "Older");
    assert!(!posts[1].has_image());

    // unchanged polls do not publish new versions
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(channel.version(), 1);

    channel.close().await;
    assert_eq!(channel.state(), SyncState::Closed);
}

#[tokio::test]
async fn failing_poll_marks_channel_stale() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/gauges"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let channel = SyncChannel::<Gauge>::open(&store, "gauges", OrderBy::desc("createdAt"))
        .await
        .unwrap();

    let mut state = channel.watch_state();
    timeout(Duration::from_secs(5), state.wait_for(|s| s.is_stale()))
        .await
        .unwrap()
        .unwrap();
    assert!(channel.items().is_empty());
}

#[tokio::test]
async fn recovered_poll_brings_channel_back_to_live() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/gauges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/gauges"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/gauges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let channel = SyncChannel::<Gauge>::open(&store, "gauges", OrderBy::desc("createdAt"))
        .await
        .unwrap();
    let mut state = channel.watch_state();

    timeout(Duration::from_secs(5), state.wait_for(|s| s.is_stale()))
        .await
        .unwrap()
        .unwrap();
    // same rows as before the failure
    timeout(Duration::from_secs(5), state.wait_for(|s| *s == SyncState::Live))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(channel.version(), 2);
    assert!(channel.items().is_empty());
}

#[tokio::test]
async fn admin_flow_over_rest() {
    let mock_server = MockServer::start().await;

    for collection in ["posts", "gauges"] {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{}", collection)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/rest/v1/gauges"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "g9" }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = StoreConfig::new(&mock_server.uri(), "test-key").unwrap();
    let options = ClientOptions::default()
        .with_admin_password("pw")
        .with_poll_interval(Duration::from_millis(20));
    let mut blog = StatusBlog::connect_rest(config, options).await.unwrap();
    blog.session().submit_password("pw").unwrap();

    let id = blog
        .gauge_manager()
        .create_gauge("Load", 12.5, GaugeType::Semicircle, vec![], Side::Right)
        .await
        .unwrap();
    assert_eq!(id, "g9");

    let requests = mock_server.received_requests().await.unwrap();
    let insert = requests
        .iter()
        .find(|r| r.method.to_string() == "POST")
        .unwrap();
    let sent: Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(sent["title"], "Load");
    assert_eq!(sent["value"].as_f64(), Some(12.5));
    assert_eq!(sent["type"], "semicircle");
    assert_eq!(sent["side"], "right");
    assert_eq!(sent["colors"], json!([]));
    assert!(sent["createdAt"].is_string());

    blog.shutdown().await;
}
