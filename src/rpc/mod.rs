// ABOUTME: JSON-RPC 2.0 transport served over HTTP at POST /rpc
// ABOUTME: Decodes envelopes, attaches HTTP credentials, and hands calls to the request processor
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # RPC transport
//!
//! A thin adapter over the [`Gateway`]: the same operations as REST, the same
//! authorization chain, and the same error taxonomy. Application failures are
//! reported with code `-32000` and `error.data.status` set to the RPC status.
//!
//! Credentials are read from the request's `auth` field, then its
//! `headers.authorization` entry, then the HTTP `Authorization` header.

/// Method routing and error mapping
pub mod processor;

pub use processor::{RpcMethod, RpcRequestProcessor};

use crate::gateway::Gateway;
use crate::jsonrpc::{error_codes, JsonRpcRequest, JsonRpcResponse};
use crate::routes::{with_http_layers, HealthRoutes};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// JSON-RPC routes
pub struct RpcRoutes;

impl RpcRoutes {
    /// Create the `POST /rpc` route
    pub fn routes(gateway: Arc<Gateway>) -> Router {
        Router::new()
            .route("/rpc", post(Self::handle_rpc))
            .with_state(RpcRequestProcessor::new(gateway))
    }

    async fn handle_rpc(
        State(processor): State<RpcRequestProcessor>,
        headers: HeaderMap,
        payload: Result<Json<Value>, JsonRejection>,
    ) -> Json<JsonRpcResponse> {
        let Ok(Json(body)) = payload else {
            return Json(JsonRpcResponse::error(
                None,
                error_codes::PARSE_ERROR,
                "Parse error",
            ));
        };

        let mut request: JsonRpcRequest = match serde_json::from_value(body) {
            Ok(request) => request,
            Err(e) => {
                return Json(JsonRpcResponse::error(
                    None,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {e}"),
                ));
            }
        };

        if request.auth_token.is_none() && request.header("authorization").is_none() {
            request.auth_token = headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(ToOwned::to_owned);
        }

        Json(processor.handle_request(request).await)
    }
}

/// Build the complete RPC listener router
#[must_use]
pub fn rpc_router(gateway: Arc<Gateway>, request_timeout: Duration) -> Router {
    let routes = Router::new()
        .merge(HealthRoutes::routes())
        .merge(RpcRoutes::routes(gateway));
    with_http_layers(routes, request_timeout)
}
