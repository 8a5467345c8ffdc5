// ABOUTME: Integration tests for the JSON-RPC transport over HTTP and the request processor
// ABOUTME: Covers protocol error codes, RPC status mapping, credential sources, and method results
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use axum::Router;
use common::{TestGateway, TEST_PASSWORD};
use helpers::axum_test::AxumTestRequest;
use herald_server::{
    broker::Channel,
    jsonrpc::{error_codes, JsonRpcRequest, JsonRpcResponse},
    models::UserRole,
    rpc::{rpc_router, RpcRequestProcessor},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn app(env: &TestGateway) -> Router {
    rpc_router(Arc::clone(&env.gateway), Duration::from_secs(5))
}

fn processor(env: &TestGateway) -> RpcRequestProcessor {
    RpcRequestProcessor::new(Arc::clone(&env.gateway))
}

async fn call(env: &TestGateway, body: &Value) -> JsonRpcResponse {
    AxumTestRequest::post("/rpc")
        .json(body)
        .send(app(env))
        .await
        .assert_status(StatusCode::OK)
        .json()
}

#[tokio::test]
async fn test_parse_error_for_malformed_body() {
    let env = TestGateway::new().await;

    let response: JsonRpcResponse = AxumTestRequest::post("/rpc")
        .raw_json("{\"jsonrpc\": \"2.0\", \"method\":")
        .send(app(&env))
        .await
        .json();
    let error = response.error.unwrap();
    assert_eq!(error.code, error_codes::PARSE_ERROR);
    assert!(response.id.is_none());
}

#[tokio::test]
async fn test_invalid_request_shapes() {
    let env = TestGateway::new().await;

    let not_an_object = call(&env, &json!([1, 2, 3])).await;
    assert_eq!(not_an_object.error.unwrap().code, error_codes::INVALID_REQUEST);

    let wrong_version = call(
        &env,
        &json!({"jsonrpc": "1.0", "method": "GetProfile", "id": 4}),
    )
    .await;
    assert_eq!(wrong_version.id, Some(json!(4)));
    assert_eq!(wrong_version.error.unwrap().code, error_codes::INVALID_REQUEST);
}

#[tokio::test]
async fn test_unknown_method() {
    let env = TestGateway::new().await;

    let response = call(
        &env,
        &json!({"jsonrpc": "2.0", "method": "Presence", "id": "abc"}),
    )
    .await;
    assert_eq!(response.id, Some(json!("abc")));
    let error = response.error.unwrap();
    assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
    assert!(error.message.contains("Presence"));
}

#[tokio::test]
async fn test_invalid_params() {
    let env = TestGateway::new().await;
    let user = env.create_user("lena", UserRole::User).await;

    let request = JsonRpcRequest::new("MarkAsRead", Some(json!({"notification_id": "seven"})))
        .with_auth(env.bearer(&user));
    let response = processor(&env).handle_request(request).await;
    assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);

    let request = JsonRpcRequest::new("Login", None);
    let response = processor(&env).handle_request(request).await;
    assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_application_errors_carry_rpc_status() {
    let env = TestGateway::new().await;
    let user = env.create_user("mona", UserRole::User).await;
    env.create_user("taken", UserRole::User).await;
    let processor = processor(&env);

    let cases = [
        (JsonRpcRequest::new("GetProfile", None), "Unauthenticated"),
        (
            JsonRpcRequest::new("GetUsers", None).with_auth(env.bearer(&user)),
            "PermissionDenied",
        ),
        (
            JsonRpcRequest::new("GetNotificationsByFilter", Some(json!({"filter": "oldest"})))
                .with_auth(env.bearer(&user)),
            "InvalidArgument",
        ),
        (
            JsonRpcRequest::new("MarkAsRead", Some(json!({"notification_id": 404})))
                .with_auth(env.bearer(&user)),
            "NotFound",
        ),
        (
            JsonRpcRequest::new(
                "Register",
                Some(json!({"username": "taken", "password": "secret123"})),
            ),
            "AlreadyExists",
        ),
    ];

    for (request, status) in cases {
        let method = request.method.clone();
        let response = processor.handle_request(request).await;
        assert!(response.is_error(), "{method}");
        assert_eq!(
            response.error.as_ref().unwrap().code,
            error_codes::APPLICATION_ERROR
        );
        assert_eq!(response.status(), Some(status), "{method}");
    }
}

#[tokio::test]
async fn test_credentials_from_http_authorization_header() {
    let env = TestGateway::new().await;
    let user = env.create_user("nina", UserRole::User).await;

    let response: JsonRpcResponse = AxumTestRequest::post("/rpc")
        .bearer(&env.bearer(&user))
        .json(&json!({"jsonrpc": "2.0", "method": "GetProfile", "id": 1}))
        .send(app(&env))
        .await
        .json();
    assert!(response.is_success());
    assert_eq!(response.result.unwrap()["username"], "nina");
}

#[tokio::test]
async fn test_body_credentials_take_precedence_over_http_header() {
    let env = TestGateway::new().await;
    let user = env.create_user("olga", UserRole::User).await;

    let response: JsonRpcResponse = AxumTestRequest::post("/rpc")
        .bearer(&env.bearer(&user))
        .json(&json!({
            "jsonrpc": "2.0",
            "method": "GetProfile",
            "id": 1,
            "auth": "Bearer garbage"
        }))
        .send(app(&env))
        .await
        .json();
    assert_eq!(response.status(), Some("Unauthenticated"));
}

#[tokio::test]
async fn test_login_publish_list_and_mark_read_over_rpc() {
    let env = TestGateway::new().await;
    env.create_admin("root").await;
    let user = env.create_user("pia", UserRole::User).await;
    env.connect(&user).await;

    let login = call(
        &env,
        &json!({
            "jsonrpc": "2.0",
            "method": "Login",
            "id": 1,
            "params": {"username": "root", "password": TEST_PASSWORD}
        }),
    )
    .await;
    let admin_token = login.result.unwrap()["access_token"]
        .as_str()
        .unwrap()
        .to_owned();

    let published = call(
        &env,
        &json!({
            "jsonrpc": "2.0",
            "method": "Publish",
            "id": 2,
            "headers": {"Authorization": format!("Bearer {admin_token}")},
            "params": {
                "channel": Channel::for_user(user.id).as_str(),
                "data": {"message": "over rpc"}
            }
        }),
    )
    .await;
    let outcome = published.result.unwrap();
    assert_eq!(outcome["viewers_marked"], 1);
    let id = outcome["notification"]["id"].as_i64().unwrap();

    let user_auth = env.bearer(&user);
    let listed = call(
        &env,
        &json!({
            "jsonrpc": "2.0",
            "method": "GetNotificationsByFilter",
            "id": 3,
            "auth": user_auth,
            "params": {"filter": "send"}
        }),
    )
    .await;
    assert_eq!(listed.result.unwrap().as_array().unwrap().len(), 1);

    let marked = call(
        &env,
        &json!({
            "jsonrpc": "2.0",
            "method": "MarkAsRead",
            "id": 4,
            "auth": user_auth,
            "params": {"notification_id": id}
        }),
    )
    .await;
    assert_eq!(marked.result.unwrap(), json!({"status": "ok"}));

    let read = call(
        &env,
        &json!({
            "jsonrpc": "2.0",
            "method": "GetNotificationsByFilter",
            "id": 5,
            "auth": user_auth,
            "params": {"filter": "sent-and-read"}
        }),
    )
    .await;
    assert_eq!(read.result.unwrap().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_publish_over_rpc_requires_admin() {
    let env = TestGateway::new().await;
    let user = env.create_user("quinn", UserRole::User).await;

    let anonymous = JsonRpcRequest::new(
        "Broadcast",
        Some(json!({"data": {"message": "spam"}})),
    );
    let response = processor(&env).handle_request(anonymous).await;
    assert_eq!(response.status(), Some("Unauthenticated"));

    let regular = JsonRpcRequest::new(
        "Broadcast",
        Some(json!({"data": {"message": "spam"}})),
    )
    .with_auth(env.bearer(&user));
    let response = processor(&env).handle_request(regular).await;
    assert_eq!(response.status(), Some("PermissionDenied"));
    assert!(env.broker.published().await.is_empty());
}

#[tokio::test]
async fn test_rpc_listener_serves_health() {
    let env = TestGateway::new().await;

    let response = AxumTestRequest::get("/health").send(app(&env)).await;
    assert_eq!(response.status(), 200);
    assert!(response.header("x-request-id").is_some());
}
