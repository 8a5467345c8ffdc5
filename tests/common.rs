// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides the in-memory store, broker fixture, token helpers, and seeded accounts
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `herald_server`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use herald_server::{
    auth::AuthManager,
    broker::{Channel, InMemoryBroker},
    crypto::keys::SigningKeyRing,
    database::{Database, NewUser},
    gateway::Gateway,
    models::{Principal, User, UserRole},
};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Signing secret shared by every test gateway
pub const TEST_SECRET: &[u8] = b"herald-test-secret-0123456789abcdef";

/// Key id of [`TEST_SECRET`]
pub const TEST_KID: &str = "test-key";

/// Fastest bcrypt cost, keeps tests quick
pub const TEST_BCRYPT_COST: u32 = 4;

/// Password used for every seeded account
pub const TEST_PASSWORD: &str = "secret123";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Arc<Database> {
    init_test_logging();
    Arc::new(
        Database::new("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database"),
    )
}

/// Create test authentication manager signing with [`TEST_SECRET`]
pub fn create_test_auth_manager() -> Arc<AuthManager> {
    let keys = SigningKeyRing::new(TEST_KID, TEST_SECRET).expect("Failed to build key ring");
    Arc::new(AuthManager::new(keys))
}

/// Everything a gateway test needs, with handles to the collaborators
pub struct TestGateway {
    /// The gateway under test
    pub gateway: Arc<Gateway>,
    /// Store behind the gateway
    pub database: Arc<Database>,
    /// Token codec behind the gateway
    pub auth_manager: Arc<AuthManager>,
    /// Broker fixture behind the gateway
    pub broker: Arc<InMemoryBroker>,
}

impl TestGateway {
    /// Fresh gateway over an empty store and an empty broker
    pub async fn new() -> Self {
        let database = create_test_database().await;
        let auth_manager = create_test_auth_manager();
        let broker = Arc::new(InMemoryBroker::new());
        let gateway = Arc::new(Gateway::new(
            Arc::clone(&database),
            Arc::clone(&auth_manager),
            broker.clone(),
            TEST_BCRYPT_COST,
        ));

        Self {
            gateway,
            database,
            auth_manager,
            broker,
        }
    }

    /// Insert an account directly into the store
    pub async fn create_user(&self, username: &str, role: UserRole) -> User {
        let password_hash = herald_server::auth::hash_password(
            TEST_PASSWORD.to_owned(),
            TEST_BCRYPT_COST,
        )
        .await
        .expect("Failed to hash password");

        self.database
            .create_user(&NewUser {
                username: username.to_owned(),
                email: None,
                password_hash,
                role,
            })
            .await
            .expect("Failed to create user")
    }

    /// Insert an admin account
    pub async fn create_admin(&self, username: &str) -> User {
        self.create_user(username, UserRole::Admin).await
    }

    /// `Bearer <access token>` for `user`
    pub fn bearer(&self, user: &User) -> String {
        let token = self
            .auth_manager
            .issue_access(user.id, user.role)
            .expect("Failed to issue access token");
        format!("Bearer {token}")
    }

    /// Principal of `user`
    pub fn principal(user: &User) -> Principal {
        user.principal()
    }

    /// Mark `user` as watching their own notification channel
    pub async fn connect(&self, user: &User) {
        self.broker
            .connect(Channel::for_user(user.id).as_str(), &user.id.to_string())
            .await;
    }
}

/// JSON object payload for publish tests
pub fn payload(message: &str) -> herald_server::models::NotificationPayload {
    let mut map = serde_json::Map::new();
    map.insert("message".to_owned(), serde_json::Value::from(message));
    map
}
