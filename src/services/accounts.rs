// ABOUTME: Account business logic for registration, login, token refresh, and user lookups
// ABOUTME: Validates credentials, hashes passwords, and issues token pairs
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::auth::{hash_password, verify_password, AuthManager, TokenPair, TokenType};
use crate::constants::limits;
use crate::database::{Database, NewUser};
use crate::errors::{AppError, AppResult};
use crate::middleware::admin_guard::require_admin;
use crate::models::{Principal, User, UserRole};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{info, warn};

const LOGIN_FAILED: &str = "incorrect username or password";

/// Account registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Unique login name, 3-20 characters
    pub username: String,
    /// Plain password, 6-20 characters
    pub password: String,
    /// Optional contact email
    #[serde(default)]
    pub email: Option<String>,
    /// `user` or `admin`, defaults to `user`
    #[serde(default)]
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login name
    pub username: String,
    /// Plain password
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token from a previous login or refresh
    pub refresh_token: String,
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_REGEX
        .get_or_init(|| {
            // Hardcoded regex pattern - should always compile
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok()
        })
        .as_ref()
}

fn is_valid_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email))
}

/// Check a registration request and resolve its role
///
/// # Errors
///
/// Returns `InvalidInput` when the username, password, email, or role is out of bounds
pub fn validate_registration(request: &RegisterRequest) -> AppResult<UserRole> {
    let username_len = request.username.chars().count();
    if !(limits::USERNAME_MIN_LENGTH..=limits::USERNAME_MAX_LENGTH).contains(&username_len) {
        return Err(AppError::invalid_input(format!(
            "username must be {}-{} characters",
            limits::USERNAME_MIN_LENGTH,
            limits::USERNAME_MAX_LENGTH
        )));
    }

    let password_len = request.password.chars().count();
    if !(limits::PASSWORD_MIN_LENGTH..=limits::PASSWORD_MAX_LENGTH).contains(&password_len) {
        return Err(AppError::invalid_input(format!(
            "password must be {}-{} characters",
            limits::PASSWORD_MIN_LENGTH,
            limits::PASSWORD_MAX_LENGTH
        )));
    }

    if let Some(email) = request.email.as_deref().filter(|e| !e.is_empty()) {
        if !is_valid_email(email) {
            return Err(AppError::invalid_input("email address is not valid"));
        }
    }

    request
        .role
        .as_deref()
        .map_or(Ok(UserRole::User), str::parse)
}

/// Create an account
///
/// # Errors
///
/// Returns `InvalidInput` for bad fields, `ResourceAlreadyExists` for a taken
/// username, or a database error
#[tracing::instrument(skip(database, request), fields(username = %request.username))]
pub async fn register(
    database: &Database,
    bcrypt_cost: u32,
    request: RegisterRequest,
) -> AppResult<User> {
    let role = validate_registration(&request)?;
    let password_hash = hash_password(request.password, bcrypt_cost).await?;

    let user = database
        .create_user(&NewUser {
            username: request.username,
            email: request.email.filter(|e| !e.is_empty()),
            password_hash,
            role,
        })
        .await?;

    info!(user_id = user.id, role = %user.role, "User registered");
    Ok(user)
}

/// Exchange a username and password for a token pair
///
/// # Errors
///
/// Returns `AuthInvalid` without saying whether the user or the password was wrong
#[tracing::instrument(skip(database, auth, request), fields(username = %request.username))]
pub async fn login(
    database: &Database,
    auth: &AuthManager,
    request: LoginRequest,
) -> AppResult<TokenPair> {
    let Some(user) = database.get_user_by_username(&request.username).await? else {
        warn!("Login failed: unknown user");
        return Err(AppError::auth_invalid(LOGIN_FAILED));
    };

    if !verify_password(request.password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "Login failed: wrong password");
        return Err(AppError::auth_invalid(LOGIN_FAILED).with_user_id(user.id));
    }

    info!(user_id = user.id, "User logged in");
    auth.issue_pair(user.id, user.role)
}

/// Exchange a refresh token for a new token pair
///
/// The role in the new pair is read from the store, so a changed role takes
/// effect on the next refresh.
///
/// # Errors
///
/// Returns `AuthInvalid` for an unverifiable or non-refresh token, `AuthExpired`
/// for an expired one, and `ResourceNotFound` if the subject no longer exists
#[tracing::instrument(skip_all)]
pub async fn refresh(
    database: &Database,
    auth: &AuthManager,
    refresh_token: &str,
) -> AppResult<TokenPair> {
    let claims = auth.parse(refresh_token)?;

    if claims.token_type != TokenType::Refresh {
        warn!(token_type = %claims.token_type, "Token refresh rejected");
        return Err(AppError::auth_invalid("invalid token: refresh token required"));
    }

    let subject = claims.principal()?;
    let user = database
        .get_user(subject.id)
        .await?
        .ok_or_else(|| AppError::not_found("user").with_user_id(subject.id))?;

    info!(user_id = user.id, "Tokens refreshed");
    auth.issue_pair(user.id, user.role)
}

/// Account of the caller
///
/// # Errors
///
/// Returns `ResourceNotFound` if the account was removed after the token was issued
pub async fn profile(database: &Database, principal: &Principal) -> AppResult<User> {
    database
        .get_user(principal.id)
        .await?
        .ok_or_else(|| AppError::not_found("user").with_user_id(principal.id))
}

/// Every account, admin only
///
/// # Errors
///
/// Returns `PermissionDenied` for non-admin callers, or a database error
pub async fn list_users(database: &Database, principal: &Principal) -> AppResult<Vec<User>> {
    require_admin(principal)?;
    database.list_users().await
}
