// ABOUTME: Notification route handlers for listing, read marking, publishing, and presence
// ABOUTME: REST endpoints authorized per operation and delegated to the gateway
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::{json_body, query_params};
use crate::errors::AppError;
use crate::gateway::Gateway;
use crate::middleware::auth::{Operation, Transport};
use crate::services::notifications::{
    BroadcastRequest, FilterRequest, MarkReadRequest, PublishRequest,
};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Query for `GET /notifications/presence`
#[derive(Debug, Deserialize)]
pub struct PresenceQuery {
    /// Channel to inspect
    pub channel: String,
}

/// Notification routes handler
pub struct NotificationRoutes;

impl NotificationRoutes {
    /// Create all notification routes
    pub fn routes(gateway: Arc<Gateway>) -> Router {
        Router::new()
            .route("/notifications", get(Self::handle_list))
            .route("/notifications/mark_read", post(Self::handle_mark_read))
            .route("/notifications/publish", post(Self::handle_publish))
            .route("/notifications/broadcast", post(Self::handle_broadcast))
            .route("/notifications/presence", get(Self::handle_presence))
            .with_state(gateway)
    }

    /// Handle GET /notifications?filter=
    async fn handle_list(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
        query: Result<Query<FilterRequest>, QueryRejection>,
    ) -> Result<Response, AppError> {
        let principal =
            gateway.principal(Transport::Rest, Operation::ListNotifications, &headers)?;
        let query = query_params(query)?;
        let notifications = gateway
            .list_filtered(&principal, query.filter_or_all())
            .await?;
        Ok((StatusCode::OK, Json(notifications)).into_response())
    }

    /// Handle POST /notifications/mark_read
    async fn handle_mark_read(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
        payload: Result<Json<MarkReadRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let principal = gateway.principal(Transport::Rest, Operation::MarkAsRead, &headers)?;
        let request = json_body(payload)?;

        gateway
            .mark_as_read(&principal, request.notification_id)
            .await?;
        Ok((StatusCode::OK, Json(json!({"status": "ok"}))).into_response())
    }

    /// Handle POST /notifications/publish - admin only
    async fn handle_publish(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
        payload: Result<Json<PublishRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let principal = gateway.principal(Transport::Rest, Operation::Publish, &headers)?;
        let request = json_body(payload)?;

        let outcome = gateway
            .publish(&principal, &request.channel, request.data)
            .await?;
        Ok((StatusCode::OK, Json(outcome)).into_response())
    }

    /// Handle POST /notifications/broadcast - admin only
    async fn handle_broadcast(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
        payload: Result<Json<BroadcastRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let principal = gateway.principal(Transport::Rest, Operation::Broadcast, &headers)?;
        let request = json_body(payload)?;

        let outcome = gateway.broadcast(&principal, request.data).await?;
        Ok((StatusCode::OK, Json(outcome)).into_response())
    }

    /// Handle GET /notifications/presence?channel= - admin only
    async fn handle_presence(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
        query: Result<Query<PresenceQuery>, QueryRejection>,
    ) -> Result<Response, AppError> {
        let principal = gateway.principal(Transport::Rest, Operation::Presence, &headers)?;
        let query = query_params(query)?;

        let snapshot = gateway.presence(&principal, &query.channel).await?;
        Ok((StatusCode::OK, Json(snapshot)).into_response())
    }
}
