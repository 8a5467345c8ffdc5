// ABOUTME: Transport-agnostic core exposing every gateway operation behind one façade
// ABOUTME: REST and RPC adapters authorize through it and pass the principal into each operation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Gateway
//!
//! [`Gateway`] owns the shared resources and is the only thing the transport
//! adapters talk to. An adapter first calls [`Gateway::authorize`] with its
//! transport, the operation, and the request's credential source, then calls
//! the operation with the returned [`Principal`].

use crate::auth::{AuthManager, TokenPair};
use crate::broker::Broker;
use crate::database::Database;
use crate::errors::AppResult;
use crate::middleware::auth::{AuthorizationChain, CredentialSource, Operation, Transport};
use crate::models::{Notification, NotificationPayload, Principal, User};
use crate::services::accounts::{self, LoginRequest, RegisterRequest};
use crate::services::notifications::{self, BroadcastOutcome, PresenceSnapshot, PublishOutcome};
use std::sync::Arc;

/// Shared core behind both transports
#[derive(Clone)]
pub struct Gateway {
    database: Arc<Database>,
    auth_manager: Arc<AuthManager>,
    broker: Arc<dyn Broker>,
    chain: AuthorizationChain,
    bcrypt_cost: u32,
}

impl Gateway {
    /// Assemble the core from its collaborators
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        auth_manager: Arc<AuthManager>,
        broker: Arc<dyn Broker>,
        bcrypt_cost: u32,
    ) -> Self {
        let chain = AuthorizationChain::new(Arc::clone(&auth_manager));
        Self {
            database,
            auth_manager,
            broker,
            chain,
            bcrypt_cost,
        }
    }

    /// Store handle
    #[must_use]
    pub const fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Token codec
    #[must_use]
    pub const fn auth_manager(&self) -> &Arc<AuthManager> {
        &self.auth_manager
    }

    /// Run the authorization chain; `None` for public operations
    ///
    /// # Errors
    ///
    /// Returns the first gate failure
    pub fn authorize<S>(
        &self,
        transport: Transport,
        operation: Operation,
        source: &S,
    ) -> AppResult<Option<Principal>>
    where
        S: CredentialSource + ?Sized,
    {
        self.chain.authorize(transport, operation, source)
    }

    /// Run the authorization chain for a protected operation
    ///
    /// # Errors
    ///
    /// Returns the first gate failure
    pub fn principal<S>(
        &self,
        transport: Transport,
        operation: Operation,
        source: &S,
    ) -> AppResult<Principal>
    where
        S: CredentialSource + ?Sized,
    {
        self.chain.require_principal(transport, operation, source)
    }

    /// Create an account
    ///
    /// # Errors
    ///
    /// See [`accounts::register`]
    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        accounts::register(&self.database, self.bcrypt_cost, request).await
    }

    /// Exchange credentials for a token pair
    ///
    /// # Errors
    ///
    /// See [`accounts::login`]
    pub async fn login(&self, request: LoginRequest) -> AppResult<TokenPair> {
        accounts::login(&self.database, &self.auth_manager, request).await
    }

    /// Exchange a refresh token for a new pair
    ///
    /// # Errors
    ///
    /// See [`accounts::refresh`]
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        accounts::refresh(&self.database, &self.auth_manager, refresh_token).await
    }

    /// Account of the caller
    ///
    /// # Errors
    ///
    /// See [`accounts::profile`]
    pub async fn profile(&self, principal: &Principal) -> AppResult<User> {
        accounts::profile(&self.database, principal).await
    }

    /// Every account
    ///
    /// # Errors
    ///
    /// See [`accounts::list_users`]
    pub async fn list_users(&self, principal: &Principal) -> AppResult<Vec<User>> {
        accounts::list_users(&self.database, principal).await
    }

    /// The caller's notifications matching `filter`
    ///
    /// # Errors
    ///
    /// See [`notifications::list_filtered`]
    pub async fn list_filtered(
        &self,
        principal: &Principal,
        filter: &str,
    ) -> AppResult<Vec<Notification>> {
        notifications::list_filtered(&self.database, principal, filter).await
    }

    /// Mark one of the caller's notifications read
    ///
    /// # Errors
    ///
    /// See [`notifications::mark_as_read`]
    pub async fn mark_as_read(&self, principal: &Principal, notification_id: i64) -> AppResult<()> {
        notifications::mark_as_read(&self.database, principal, notification_id).await
    }

    /// Publish to the owner of `channel`
    ///
    /// # Errors
    ///
    /// See [`notifications::publish`]
    pub async fn publish(
        &self,
        principal: &Principal,
        channel: &str,
        payload: NotificationPayload,
    ) -> AppResult<PublishOutcome> {
        notifications::publish(
            &self.database,
            self.broker.as_ref(),
            principal,
            channel,
            payload,
        )
        .await
    }

    /// Publish to every regular user
    ///
    /// # Errors
    ///
    /// See [`notifications::broadcast`]
    pub async fn broadcast(
        &self,
        principal: &Principal,
        payload: NotificationPayload,
    ) -> AppResult<BroadcastOutcome> {
        notifications::broadcast(&self.database, self.broker.as_ref(), principal, payload).await
    }

    /// Users subscribed to `channel`
    ///
    /// # Errors
    ///
    /// See [`notifications::presence`]
    pub async fn presence(&self, principal: &Principal, channel: &str) -> AppResult<PresenceSnapshot> {
        notifications::presence(self.broker.as_ref(), principal, channel).await
    }
}
