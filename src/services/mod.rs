// ABOUTME: Domain service layer for account and notification business logic
// ABOUTME: Provides transport-agnostic operations reused by the REST and RPC adapters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Domain service layer
//!
//! Business rules live here, independent of the transport that reached them.
//! Every protected operation takes the caller's [`Principal`](crate::models::Principal)
//! as an explicit parameter.

/// Registration, login, token refresh, and user lookups
pub mod accounts;

/// Notification publishing, delivery tracking, and listing
pub mod notifications;
