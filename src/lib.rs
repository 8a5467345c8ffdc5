// ABOUTME: Main library entry point for the Herald notification gateway
// ABOUTME: Provides REST and JSON-RPC transports over one authorization chain and delivery core
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # Herald Server
//!
//! A presence-aware notification gateway. Administrators publish notifications
//! to per-user channels on a Centrifugo broker; users list their notifications
//! and mark them read. Every notification is persisted before it is published,
//! and users watching the channel at publish time are recorded as having
//! received it.
//!
//! ## Features
//!
//! - **Dual transport**: REST over axum and JSON-RPC 2.0 over HTTP
//! - **One authorization chain**: allowlist, bearer authentication, role gate
//! - **Rotating signing keys**: HS256 tokens carry a `kid`, retired keys still verify
//! - **Presence-aware delivery**: present viewers are marked sent after publish
//! - **Filtered listing**: all, read, unread, sent, unsent and their combinations
//!
//! ## Architecture
//!
//! - **Gateway**: transport-agnostic façade over the services
//! - **Middleware**: authorization chain, admin guard, credential redaction
//! - **Services**: account and notification workflows
//! - **Database**: `SQLite` store for users and notifications
//! - **Broker**: Centrifugo HTTP API client behind the [`broker::Broker`] trait
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use herald_server::config::environment::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("REST on {}, RPC on {}", config.http.http_port, config.http.rpc_port);
//!     Ok(())
//! }
//! ```

/// JWT issuing and validation, password hashing
pub mod auth;

/// Pub/sub broker abstraction and the Centrifugo client
pub mod broker;

/// Environment-driven configuration
pub mod config;

/// Application constants and environment lookups
pub mod constants;

/// Signing key ring for token rotation
pub mod crypto;

/// `SQLite` store for users and notifications
pub mod database;

/// Unified error handling and transport status mapping
pub mod errors;

/// Transport-agnostic operation façade
pub mod gateway;

/// JSON-RPC 2.0 wire types
pub mod jsonrpc;

/// Structured logging setup
pub mod logging;

/// Authorization chain, admin guard, CORS, request tracing
pub mod middleware;

/// Domain models: users, principals, notifications, filters
pub mod models;

/// REST routes
pub mod routes;

/// JSON-RPC routes and dispatch
pub mod rpc;

/// Account and notification business logic
pub mod services;
