// ABOUTME: User store database operations
// ABOUTME: Handles account creation and lookup by id, username, and role

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{User, UserRole};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Account to insert; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique login name
    pub username: String,
    /// Optional contact email
    pub email: Option<String>,
    /// bcrypt hash
    pub password_hash: String,
    /// Account role
    pub role: UserRole,
}

impl Database {
    /// Create the users table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_users(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a new user
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` if the username is taken, or a database error
    pub async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let created_at = Utc::now();

        let result = sqlx::query(
            r"
            INSERT INTO users (username, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::already_exists(format!("user '{}'", user.username))
            }
            _ => AppError::from(e),
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            password_hash: user.password_hash.clone(),
            created_at,
        })
    }

    /// Get user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is unreadable
    pub async fn get_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, username, email, password_hash, role, created_at
            FROM users WHERE id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Get user by username
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is unreadable
    pub async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, username, email, password_hash, role, created_at
            FROM users WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// List every user ordered by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is unreadable
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            r"
            SELECT id, username, email, password_hash, role, created_at
            FROM users ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_user).collect()
    }

    /// List users holding `role`, ordered by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is unreadable
    pub async fn list_users_by_role(&self, role: UserRole) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            r"
            SELECT id, username, email, password_hash, role, created_at
            FROM users WHERE role = $1 ORDER BY id ASC
            ",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_user).collect()
    }

    fn row_to_user(row: &SqliteRow) -> AppResult<User> {
        let role: String = row.try_get("role")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: role
                .parse()
                .map_err(|_| AppError::database(format!("unknown role '{role}' in users")))?,
            created_at,
        })
    }
}
