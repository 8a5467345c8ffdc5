// ABOUTME: REST route organization and router assembly for the gateway HTTP endpoints
// ABOUTME: Merges domain route groups and applies CORS, tracing, request id, and timeout layers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! REST transport
//!
//! Each domain module holds route definitions and thin handlers that authorize
//! through the [`Gateway`] and delegate to it. Errors render as
//! `{"error": "<message>"}` with the status from the error code.

/// Registration, login, and token refresh routes
pub mod auth;
/// Health check routes
pub mod health;
/// Notification listing, read marking, publishing, and presence routes
pub mod notifications;
/// Profile and user listing routes
pub mod users;

pub use auth::AuthRoutes;
pub use health::HealthRoutes;
pub use notifications::NotificationRoutes;
pub use users::UserRoutes;

use crate::errors::{AppError, AppResult};
use crate::gateway::Gateway;
use crate::middleware::tracing::request_id_header;
use crate::middleware::{create_request_span, setup_cors, MakeRequestIdPrefixed};
use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the complete REST router
#[must_use]
pub fn rest_router(
    gateway: Arc<Gateway>,
    request_timeout: Duration,
    cors_allowed_origins: &str,
) -> Router {
    let routes = Router::new()
        .merge(HealthRoutes::routes())
        .merge(AuthRoutes::routes(Arc::clone(&gateway)))
        .merge(UserRoutes::routes(Arc::clone(&gateway)))
        .merge(NotificationRoutes::routes(gateway));

    with_http_layers(routes, request_timeout).layer(setup_cors(cors_allowed_origins))
}

/// Request id, tracing, and timeout layers shared by every HTTP listener
#[must_use]
pub fn with_http_layers(router: Router, request_timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(
                request_id_header(),
                MakeRequestIdPrefixed,
            ))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &Request<Body>| create_request_span(request)),
            )
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                request_timeout,
            )),
    )
}

/// Unwrap a JSON body, turning extractor rejections into `InvalidFormat`
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::invalid_format(rejection.body_text()))
}

/// Unwrap a query string, turning extractor rejections into `InvalidFormat`
pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| AppError::invalid_format(rejection.body_text()))
}
