// ABOUTME: SQLite database manager owning the connection pool and schema migrations
// ABOUTME: Hosts the user store and the notification store as `Database` methods
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Database Management
//!
//! [`Database`] wraps a `SQLite` pool. Store operations live in the
//! `users` and `notifications` submodules as inherent methods.

mod notifications;
mod users;

pub use users::NewUser;

use crate::errors::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Database manager for users and notifications
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// `sqlite::memory:` yields a private in-memory database held by a single connection.
    /// For file databases the parent directory is created when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the directory or file cannot be created,
    /// or migrations fail
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = Self::is_memory_url(database_url);
        if !in_memory {
            Self::ensure_parent_dir(options.get_filename())?;
        }

        let pool_options = if in_memory {
            // Every pooled connection would otherwise see its own empty database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options.connect_with(options).await?;
        let db = Self { pool };

        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any table or index creation fails
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_users().await?;
        self.migrate_notifications().await?;
        Ok(())
    }

    fn ensure_parent_dir(path: &Path) -> AppResult<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::database(format!(
                        "cannot create database directory {}: {e}",
                        parent.display()
                    ))
                })
            }
            _ => Ok(()),
        }
    }

    fn is_memory_url(database_url: &str) -> bool {
        database_url.contains(":memory:") || database_url.contains("mode=memory")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn create_test_db() -> AppResult<Database> {
        Database::new("sqlite::memory:").await
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = create_test_db().await.unwrap();
        db.migrate().await.unwrap();
    }

    #[test]
    fn test_memory_url_detection() {
        assert!(Database::is_memory_url("sqlite::memory:"));
        assert!(Database::is_memory_url("sqlite:file:herald?mode=memory&cache=shared"));
        assert!(!Database::is_memory_url("sqlite:./data/herald.db"));
    }
}
