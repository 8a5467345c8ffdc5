// ABOUTME: User route handlers for the caller's profile and the admin user listing
// ABOUTME: Authenticated REST endpoints that delegate to the gateway account operations
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::errors::AppError;
use crate::gateway::Gateway;
use crate::middleware::auth::{Operation, Transport};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

/// User routes handler
pub struct UserRoutes;

impl UserRoutes {
    /// Create all user routes
    pub fn routes(gateway: Arc<Gateway>) -> Router {
        Router::new()
            .route("/profile", get(Self::handle_profile))
            .route("/users", get(Self::handle_list_users))
            .with_state(gateway)
    }

    /// Handle GET /profile
    async fn handle_profile(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = gateway.principal(Transport::Rest, Operation::Profile, &headers)?;
        let user = gateway.profile(&principal).await?;
        Ok((StatusCode::OK, Json(user)).into_response())
    }

    /// Handle GET /users - admin only
    async fn handle_list_users(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = gateway.principal(Transport::Rest, Operation::ListUsers, &headers)?;
        let users = gateway.list_users(&principal).await?;
        Ok((StatusCode::OK, Json(users)).into_response())
    }
}
