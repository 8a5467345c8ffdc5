// ABOUTME: Account route handlers for registration, login, and token refresh
// ABOUTME: Public REST endpoints that delegate to the gateway account operations
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Authentication routes
//!
//! All three endpoints are on the public allowlist; they still pass through
//! the authorization chain so the gate decision is logged uniformly.

use super::json_body;
use crate::errors::AppError;
use crate::gateway::Gateway;
use crate::middleware::auth::{Operation, Transport};
use crate::services::accounts::{LoginRequest, RefreshRequest, RegisterRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

/// Account routes handler
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all account routes
    pub fn routes(gateway: Arc<Gateway>) -> Router {
        Router::new()
            .route("/register", post(Self::handle_register))
            .route("/login", post(Self::handle_login))
            .route(
                "/token_refresh",
                get(Self::handle_token_refresh).post(Self::handle_token_refresh),
            )
            .with_state(gateway)
    }

    /// Handle POST /register
    async fn handle_register(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
        payload: Result<Json<RegisterRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        gateway.authorize(Transport::Rest, Operation::Register, &headers)?;
        let user = gateway.register(json_body(payload)?).await?;
        Ok((StatusCode::CREATED, Json(user)).into_response())
    }

    /// Handle POST /login
    async fn handle_login(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
        payload: Result<Json<LoginRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        gateway.authorize(Transport::Rest, Operation::Login, &headers)?;
        let tokens = gateway.login(json_body(payload)?).await?;
        Ok((StatusCode::OK, Json(tokens)).into_response())
    }

    /// Handle GET|POST /token_refresh
    async fn handle_token_refresh(
        State(gateway): State<Arc<Gateway>>,
        headers: HeaderMap,
        payload: Result<Json<RefreshRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        gateway.authorize(Transport::Rest, Operation::TokenRefresh, &headers)?;
        let request = json_body(payload)?;
        let tokens = gateway.refresh(&request.refresh_token).await?;
        Ok((StatusCode::OK, Json(tokens)).into_response())
    }
}
