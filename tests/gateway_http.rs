//! Gateway HTTP surface tests.

use std::net::SocketAddr;

use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_gateway_status() {
    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("http://{}/status", gateway))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "API Gateway is running");

    shutdown.trigger();
}

#[tokio::test]
async fn test_register_then_lookup() {
    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;
    let client = reqwest::Client::new();

    common::register_service(gateway, "battleship", "http://127.0.0.1:28511").await;

    let res = client
        .get(format!("http://{}/lookup/battleship", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["serviceAddresses"],
        json!(["http://127.0.0.1:28511"])
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_lookup_unknown_service_is_404() {
    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}/lookup/ghost", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_register_missing_fields_is_400() {
    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;

    let res = reqwest::Client::new()
        .post(format!("http://{}/register", gateway))
        .json(&json!({ "serviceName": "battleship" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    shutdown.trigger();
}

#[tokio::test]
async fn test_registry_status_reports_store_token() {
    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}/registry/status", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["store"], "PONG");

    shutdown.trigger();
}

#[tokio::test]
async fn test_instance_peek_does_not_advance() {
    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;
    let client = reqwest::Client::new();

    common::register_service(gateway, "battleship", "http://127.0.0.1:28521").await;
    common::register_service(gateway, "battleship", "http://127.0.0.1:28522").await;

    for _ in 0..2 {
        let res = client
            .get(format!("http://{}/battleship/instance", gateway))
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["instance"], "http://127.0.0.1:28521");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_round_robin_rotates_between_instances() {
    let b1: SocketAddr = "127.0.0.1:28531".parse().unwrap();
    let b2: SocketAddr = "127.0.0.1:28532".parse().unwrap();
    common::start_mock_backend(b1, r#"{"instance":"b1"}"#).await;
    common::start_mock_backend(b2, r#"{"instance":"b2"}"#).await;

    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    common::register_service(gateway, "battleship", &format!("http://{}", b1)).await;
    common::register_service(gateway, "battleship", &format!("http://{}", b2)).await;

    let mut seen = Vec::new();
    for _ in 0..4 {
        let res = client
            .get(format!("http://{}/battleship/status", gateway))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        seen.push(body["instance"].as_str().unwrap().to_string());
    }

    // Each instance visited once before repeating.
    assert_eq!(seen[0], seen[2]);
    assert_eq!(seen[1], seen[3]);
    assert_ne!(seen[0], seen[1]);

    shutdown.trigger();
}

#[tokio::test]
async fn test_auth_action_requires_authorization_header() {
    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;

    let res = reqwest::Client::new()
        .post(format!("http://{}/auth/profile", gateway))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Authorization header is required"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_auth_unsupported_action_is_400() {
    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;

    let res = reqwest::Client::new()
        .post(format!("http://{}/auth/drop-table", gateway))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    shutdown.trigger();
}

#[tokio::test]
async fn test_auth_register_forwards_to_profile_backend() {
    let backend: SocketAddr = "127.0.0.1:28541".parse().unwrap();
    common::start_routing_backend(backend, |path, body| async move {
        assert_eq!(path, "/auth/register");
        assert!(body.contains("marius"));
        (200, r#"{"message":"User registered"}"#.to_string())
    })
    .await;

    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;
    common::register_service(gateway, "profile", &format!("http://{}", backend)).await;

    let res = reqwest::Client::new()
        .post(format!("http://{}/auth/register", gateway))
        .json(&json!({ "username": "marius", "password": "secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User registered");

    shutdown.trigger();
}

#[tokio::test]
async fn test_proxied_status_of_unregistered_service_is_503() {
    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}/battleship/status", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    shutdown.trigger();
}
