// ABOUTME: Central admin authorization guard for operations requiring admin privileges
// ABOUTME: Verifies the principal holds the admin role and returns PermissionDenied if not
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Admin Authorization Guard
//!
//! Instead of each operation checking `principal.role` inline, admin-only
//! operations call [`require_admin`].
//!
//! ```rust
//! use herald_server::middleware::admin_guard::require_admin;
//! use herald_server::models::{Principal, UserRole};
//!
//! assert!(require_admin(&Principal::new(1, UserRole::Admin)).is_ok());
//! assert!(require_admin(&Principal::new(2, UserRole::User)).is_err());
//! ```

use crate::errors::{AppError, AppResult};
use crate::models::Principal;

/// Require admin privileges for a principal
///
/// # Errors
///
/// Returns `PermissionDenied` (403) if the principal is not an admin
pub fn require_admin(principal: &Principal) -> AppResult<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AppError::permission_denied("admin privileges required").with_user_id(principal.id))
    }
}
