// ABOUTME: Ordered authorization chain shared by the REST and RPC transports
// ABOUTME: Applies the public allowlist, bearer token authentication, and the admin role gate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Authorization Chain
//!
//! Every inbound operation passes three ordered gates:
//!
//! 1. **Allowlist**: public operations bypass authentication
//! 2. **Authentication**: `Authorization: Bearer <access token>` yields a [`Principal`]
//! 3. **Role**: admin operations require `role == admin`
//!
//! The first failing gate rejects the call. Rejections are logged with the
//! credential reduced to its shape by [`describe_authorization`].
//!
//! Both transports share one [`OperationPolicy`] table. The RPC allowlist
//! historically also names `Publish` and `Broadcast`; for those the role gate
//! authenticates on its own, so the outcome is admins-only on both transports.

use crate::auth::{AuthManager, TokenType};
use crate::errors::{AppError, AppResult};
use crate::jsonrpc::JsonRpcRequest;
use crate::middleware::admin_guard::require_admin;
use crate::middleware::redaction::describe_authorization;
use crate::models::Principal;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::fmt;
use std::sync::Arc;
use tracing::field::Empty;

/// Inbound transport of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// REST over axum
    Rest,
    /// JSON-RPC 2.0 over HTTP
    Rpc,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rest => "rest",
            Self::Rpc => "rpc",
        })
    }
}

/// Access requirement of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPolicy {
    /// No credential needed
    Public,
    /// Any valid access token
    Authenticated,
    /// Access token of an admin
    Admin,
}

/// Operation vocabulary shared by both transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create an account
    Register,
    /// Exchange credentials for tokens
    Login,
    /// Exchange a refresh token for new tokens
    TokenRefresh,
    /// Read own account
    Profile,
    /// List every account
    ListUsers,
    /// List own notifications
    ListNotifications,
    /// Mark own notification read
    MarkAsRead,
    /// Publish to one user
    Publish,
    /// Publish to every regular user
    Broadcast,
    /// Inspect channel presence
    Presence,
}

impl Operation {
    /// Every operation
    pub const ALL: [Self; 10] = [
        Self::Register,
        Self::Login,
        Self::TokenRefresh,
        Self::Profile,
        Self::ListUsers,
        Self::ListNotifications,
        Self::MarkAsRead,
        Self::Publish,
        Self::Broadcast,
        Self::Presence,
    ];

    /// Access requirement, identical on both transports
    #[must_use]
    pub const fn policy(self) -> OperationPolicy {
        match self {
            Self::Register | Self::Login | Self::TokenRefresh => OperationPolicy::Public,
            Self::Profile | Self::ListNotifications | Self::MarkAsRead => {
                OperationPolicy::Authenticated
            }
            Self::ListUsers | Self::Publish | Self::Broadcast | Self::Presence => {
                OperationPolicy::Admin
            }
        }
    }

    /// Whether the transport's allowlist skips the authentication-only gate
    #[must_use]
    pub const fn is_allowlisted(self, transport: Transport) -> bool {
        match transport {
            Transport::Rest => matches!(self.policy(), OperationPolicy::Public),
            Transport::Rpc => {
                matches!(self.policy(), OperationPolicy::Public)
                    || matches!(self, Self::Publish | Self::Broadcast)
            }
        }
    }

    /// Operation name used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "Register",
            Self::Login => "Login",
            Self::TokenRefresh => "TokenRefresh",
            Self::Profile => "Profile",
            Self::ListUsers => "ListUsers",
            Self::ListNotifications => "ListNotifications",
            Self::MarkAsRead => "MarkAsRead",
            Self::Publish => "Publish",
            Self::Broadcast => "Broadcast",
            Self::Presence => "Presence",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a call's `Authorization` value comes from
pub trait CredentialSource {
    /// Raw `Authorization` value, if any
    fn authorization(&self) -> Option<&str>;
}

impl CredentialSource for HeaderMap {
    fn authorization(&self) -> Option<&str> {
        self.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }
}

impl CredentialSource for JsonRpcRequest {
    fn authorization(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .or_else(|| self.header("authorization"))
    }
}

impl CredentialSource for Option<&str> {
    fn authorization(&self) -> Option<&str> {
        *self
    }
}

/// The single gate implementation used by every transport
#[derive(Clone)]
pub struct AuthorizationChain {
    auth_manager: Arc<AuthManager>,
}

impl AuthorizationChain {
    /// Create a chain validating tokens with `auth_manager`
    #[must_use]
    pub const fn new(auth_manager: Arc<AuthManager>) -> Self {
        Self { auth_manager }
    }

    /// Run every gate for `operation`
    ///
    /// Returns `None` for public operations and the caller's principal otherwise.
    ///
    /// # Errors
    ///
    /// Returns an `Unauthenticated` error (`AuthRequired`, `AuthInvalidHeader`,
    /// `AuthInvalid`, `AuthExpired`, `AuthWrongTokenType`) or `PermissionDenied`
    #[tracing::instrument(
        skip(self, transport, operation, source),
        fields(
            transport = %transport,
            operation = %operation,
            user_id = Empty,
            role = Empty,
        )
    )]
    pub fn authorize<S>(
        &self,
        transport: Transport,
        operation: Operation,
        source: &S,
    ) -> AppResult<Option<Principal>>
    where
        S: CredentialSource + ?Sized,
    {
        self.run_gates(transport, operation, source).map_err(|e| {
            tracing::warn!(
                credential = %describe_authorization(source.authorization()),
                code = ?e.code,
                "Request rejected: {}",
                e.message
            );
            e
        })
    }

    /// Like [`Self::authorize`] for operations that always carry a principal
    ///
    /// # Errors
    ///
    /// Same as [`Self::authorize`]; a public operation yields `AuthRequired`
    pub fn require_principal<S>(
        &self,
        transport: Transport,
        operation: Operation,
        source: &S,
    ) -> AppResult<Principal>
    where
        S: CredentialSource + ?Sized,
    {
        self.authorize(transport, operation, source)?
            .ok_or_else(AppError::auth_required)
    }

    fn run_gates<S>(
        &self,
        transport: Transport,
        operation: Operation,
        source: &S,
    ) -> AppResult<Option<Principal>>
    where
        S: CredentialSource + ?Sized,
    {
        let policy = operation.policy();

        let mut principal = if operation.is_allowlisted(transport) {
            None
        } else {
            Some(self.authenticate(source.authorization())?)
        };

        if policy == OperationPolicy::Admin {
            let admin = match principal {
                Some(p) => p,
                None => self.authenticate(source.authorization())?,
            };
            require_admin(&admin)?;
            principal = Some(admin);
        }

        if let Some(p) = &principal {
            tracing::Span::current()
                .record("user_id", p.id)
                .record("role", p.role.as_str());
        }
        Ok(principal)
    }

    /// Authentication gate: a well-formed bearer access token
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` for a missing header, `AuthInvalidHeader` for a
    /// header that is not `Bearer <token>`, `AuthInvalid` or `AuthExpired` for a
    /// failed parse, and `AuthWrongTokenType` for a refresh token
    pub fn authenticate(&self, header: Option<&str>) -> AppResult<Principal> {
        let header = header.unwrap_or_default();
        if header.trim().is_empty() {
            return Err(AppError::auth_required());
        }

        let token = match header.split(' ').collect::<Vec<_>>().as_slice() {
            ["Bearer", token] if !token.is_empty() => *token,
            _ => return Err(AppError::auth_invalid_header()),
        };

        let claims = self.auth_manager.parse(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AppError::wrong_token_type(TokenType::Access));
        }

        Ok(claims.principal()?)
    }
}
