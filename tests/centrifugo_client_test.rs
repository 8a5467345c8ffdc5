// ABOUTME: Integration tests for the Centrifugo client against a local fake server API
// ABOUTME: Checks request shape, API key header, reply decoding, and error propagation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use herald_server::broker::{Broker, BrokerError, CentrifugoClient, CentrifugoConfig};
use herald_server::errors::{AppError, ErrorCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

const API_KEY: &str = "fake-api-key";

#[derive(Clone, Default)]
struct FakeCentrifugo {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn handle_api(
    State(fake): State<FakeCentrifugo>,
    Path(method): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    fake.calls.lock().await.push((method.clone(), body.clone()));

    let reply = match method.as_str() {
        "presence" if body["channel"] == "notifications:user#1" => json!({
            "result": {
                "presence": {
                    "b-conn": {"client": "b-conn", "user": "1"},
                    "a-conn": {"client": "a-conn", "user": "1", "conn_info": {"ua": "test"}}
                }
            }
        }),
        "presence" => json!({"result": {"presence": {}}}),
        "publish" if body["channel"] == "notifications:user#13" => {
            json!({"error": {"code": 102, "message": "unknown channel"}})
        }
        "publish" => json!({"result": {"offset": 7, "epoch": "xyz"}}),
        "broadcast" => {
            let responses: Vec<Value> = body["channels"]
                .as_array()
                .map(|channels| {
                    channels
                        .iter()
                        .map(|channel| {
                            if *channel == "notifications:user#13" {
                                json!({"error": {"code": 102, "message": "unknown channel"}})
                            } else {
                                json!({"result": {}})
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            json!({"result": {"responses": responses}})
        }
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(reply).into_response()
}

async fn start_fake() -> (String, FakeCentrifugo) {
    let fake = FakeCentrifugo::default();
    let app = Router::new()
        .route("/api/:method", post(handle_api))
        .with_state(fake.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api"), fake)
}

fn client(api_url: &str, api_key: &str) -> CentrifugoClient {
    CentrifugoClient::new(CentrifugoConfig {
        api_url: api_url.to_owned(),
        api_key: api_key.to_owned(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_presence_lists_connected_clients() {
    let (url, fake) = start_fake().await;
    let client = client(&url, API_KEY);

    let clients = client.presence("notifications:user#1").await.unwrap();
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0].client, "a-conn");
    assert_eq!(clients[1].client, "b-conn");
    assert!(clients.iter().all(|c| c.user == "1"));

    assert!(client.presence("notifications:user#2").await.unwrap().is_empty());

    let calls = fake.calls.lock().await;
    assert_eq!(calls[0].0, "presence");
    assert_eq!(calls[0].1, json!({"channel": "notifications:user#1"}));
}

#[tokio::test]
async fn test_publish_returns_receipt() {
    let (url, fake) = start_fake().await;
    let client = client(&format!("{url}/"), API_KEY);

    let receipt = client
        .publish("notifications:user#1", &json!({"message": "hi"}))
        .await
        .unwrap();
    assert_eq!(receipt.offset, 7);
    assert_eq!(receipt.epoch, "xyz");

    let calls = fake.calls.lock().await;
    assert_eq!(calls[0].0, "publish");
    assert_eq!(calls[0].1["data"]["message"], "hi");
}

#[tokio::test]
async fn test_error_object_becomes_external_service_error() {
    let (url, _fake) = start_fake().await;
    let client = client(&url, API_KEY);

    let error = client
        .publish("notifications:user#13", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(error, BrokerError::Api { code: 102, .. }));

    let app_error = AppError::from(error);
    assert_eq!(app_error.code, ErrorCode::ExternalServiceError);
    assert_eq!(app_error.http_status(), 502);
}

#[tokio::test]
async fn test_broadcast_surfaces_per_channel_errors() {
    let (url, _fake) = start_fake().await;
    let client = client(&url, API_KEY);

    client
        .broadcast(
            &["notifications:user#1".to_owned(), "notifications:user#2".to_owned()],
            &json!({"message": "all"}),
        )
        .await
        .unwrap();

    let error = client
        .broadcast(
            &["notifications:user#1".to_owned(), "notifications:user#13".to_owned()],
            &json!({"message": "all"}),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, BrokerError::Api { code: 102, .. }));
}

#[tokio::test]
async fn test_wrong_api_key_is_transport_error() {
    let (url, fake) = start_fake().await;
    let client = client(&url, "wrong-key");

    let error = client.presence("notifications:user#1").await.unwrap_err();
    assert!(matches!(error, BrokerError::Transport(_)));
    assert!(fake.calls.lock().await.is_empty());
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}/api"), API_KEY);
    let error = client
        .publish("notifications:user#1", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(error, BrokerError::Transport(_)));
}
