// ABOUTME: Core domain models for users, principals, notifications, and notification filters
// ABOUTME: Shared by the store, the authorization chain, and both transport adapters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Data Models
//!
//! - [`User`]: persisted account with role, password hash never serialized
//! - [`Principal`]: authenticated identity derived per request from an access token
//! - [`Notification`]: per-user notification row with its delivery timestamps
//! - [`NotificationFilter`]: fixed vocabulary of delivery-state filters

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Opaque key/value payload carried by a notification
pub type NotificationPayload = Map<String, Value>;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account, receives broadcasts
    #[default]
    User,
    /// Administrative account
    Admin,
}

impl UserRole {
    /// Role name as stored and carried in tokens
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Whether this role passes the admin gate
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::invalid_input(format!(
                "role must be 'user' or 'admin', got '{other}'"
            ))),
        }
    }
}

/// Persisted user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Numeric user id
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// Optional contact email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Account role
    pub role: UserRole,
    /// bcrypt hash, never serialized
    #[serde(skip)]
    pub password_hash: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Identity of this user as an authorization principal
    #[must_use]
    pub const fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            role: self.role,
        }
    }
}

/// Authenticated identity threaded explicitly through every protected operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id taken from the token subject
    pub id: i64,
    /// Role taken from the token claims
    pub role: UserRole,
}

impl Principal {
    /// Build a principal
    #[must_use]
    pub const fn new(id: i64, role: UserRole) -> Self {
        Self { id, role }
    }

    /// Whether this principal holds the admin role
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Notification row with delivery timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification id
    pub id: i64,
    /// Owning user, immutable after creation
    pub user_id: i64,
    /// Opaque payload
    pub payload: NotificationPayload,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Set once when a present subscriber was marked as having received it
    pub sent_at: Option<DateTime<Utc>>,
    /// Set once when the owner marked it read
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Whether the notification was confirmed sent
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }

    /// Whether the notification was marked read
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Delivery-state filter over `(sent_at, read_at)` nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NotificationFilter {
    /// Every row
    #[default]
    All,
    /// `read_at` unset
    Unread,
    /// `read_at` set
    Read,
    /// `sent_at` unset
    Unsent,
    /// `sent_at` set
    Sent,
    /// both set
    SentAndRead,
    /// sent, not read
    SentAndUnread,
    /// read without having been sent
    UnsentAndRead,
    /// neither set
    UnsentAndUnread,
}

impl NotificationFilter {
    /// Every filter in the vocabulary
    pub const ALL_FILTERS: [Self; 9] = [
        Self::All,
        Self::Unread,
        Self::Read,
        Self::Unsent,
        Self::Sent,
        Self::SentAndRead,
        Self::SentAndUnread,
        Self::UnsentAndRead,
        Self::UnsentAndUnread,
    ];

    /// Canonical filter name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Unread => "unread",
            Self::Read => "read",
            Self::Unsent => "unsent",
            Self::Sent => "sent",
            Self::SentAndRead => "sent-and-read",
            Self::SentAndUnread => "sent-and-unread",
            Self::UnsentAndRead => "unsent-and-read",
            Self::UnsentAndUnread => "unsent-and-unread",
        }
    }

    /// `WHERE` fragment selecting rows of this filter; static text only
    #[must_use]
    pub const fn sql_predicate(self) -> &'static str {
        match self {
            Self::All => "1 = 1",
            Self::Unread => "read_at IS NULL",
            Self::Read => "read_at IS NOT NULL",
            Self::Unsent => "sent_at IS NULL",
            Self::Sent => "sent_at IS NOT NULL",
            Self::SentAndRead => "sent_at IS NOT NULL AND read_at IS NOT NULL",
            Self::SentAndUnread => "sent_at IS NOT NULL AND read_at IS NULL",
            Self::UnsentAndRead => "sent_at IS NULL AND read_at IS NOT NULL",
            Self::UnsentAndUnread => "sent_at IS NULL AND read_at IS NULL",
        }
    }

    /// In-memory form of [`Self::sql_predicate`]
    #[must_use]
    pub const fn matches(self, notification: &Notification) -> bool {
        let sent = notification.is_sent();
        let read = notification.is_read();
        match self {
            Self::All => true,
            Self::Unread => !read,
            Self::Read => read,
            Self::Unsent => !sent,
            Self::Sent => sent,
            Self::SentAndRead => sent && read,
            Self::SentAndUnread => sent && !read,
            Self::UnsentAndRead => !sent && read,
            Self::UnsentAndUnread => !sent && !read,
        }
    }
}

impl fmt::Display for NotificationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationFilter {
    type Err = AppError;

    /// Accepts canonical names, their underscore forms, and the legacy
    /// `send`/`unsend` spellings. Matching is exact.
    fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "all" => Ok(Self::All),
            "unread" => Ok(Self::Unread),
            "read" => Ok(Self::Read),
            "unsent" | "unsend" => Ok(Self::Unsent),
            "sent" | "send" => Ok(Self::Sent),
            "sent-and-read" | "sent_and_read" | "sendandread" => Ok(Self::SentAndRead),
            "sent-and-unread" | "sent_and_unread" | "sendandunread" => Ok(Self::SentAndUnread),
            "unsent-and-read" | "unsent_and_read" | "unsendandread" => Ok(Self::UnsentAndRead),
            "unsent-and-unread" | "unsent_and_unread" | "unsendandunread" => {
                Ok(Self::UnsentAndUnread)
            }
            _ => Err(AppError::invalid_filter(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    fn notification(sent: bool, read: bool) -> Notification {
        let now = Utc::now();
        Notification {
            id: 1,
            user_id: 1,
            payload: Map::new(),
            created_at: now,
            sent_at: sent.then_some(now),
            read_at: read.then_some(now),
        }
    }

    #[test]
    fn test_filter_accepts_canonical_and_legacy_names() {
        for filter in NotificationFilter::ALL_FILTERS {
            assert_eq!(filter.as_str().parse::<NotificationFilter>().unwrap(), filter);
        }
        assert_eq!(
            "unsend".parse::<NotificationFilter>().unwrap(),
            NotificationFilter::Unsent
        );
        assert_eq!(
            "sendandunread".parse::<NotificationFilter>().unwrap(),
            NotificationFilter::SentAndUnread
        );
        assert_eq!(
            "unsent_and_read".parse::<NotificationFilter>().unwrap(),
            NotificationFilter::UnsentAndRead
        );
    }

    #[test]
    fn test_filter_rejects_unknown_names() {
        let err = "delivered".parse::<NotificationFilter>().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilter);
        assert!("".parse::<NotificationFilter>().is_err());
    }

    #[test]
    fn test_filter_rejects_garbled_spellings() {
        for name in ["r-e-a-d", "__all__", "UN_SE-ND", "s_e_n_t", "Sent", " all", "sent_and-read", "sentandread"] {
            let err = name.parse::<NotificationFilter>().unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidFilter, "{name}");
        }
    }

    #[test]
    fn test_filter_predicates_partition_states() {
        let states = [
            notification(false, false),
            notification(true, false),
            notification(false, true),
            notification(true, true),
        ];
        let pairs = [
            NotificationFilter::SentAndRead,
            NotificationFilter::SentAndUnread,
            NotificationFilter::UnsentAndRead,
            NotificationFilter::UnsentAndUnread,
        ];
        for state in &states {
            let hits = pairs.iter().filter(|f| f.matches(state)).count();
            assert_eq!(hits, 1);
            assert!(NotificationFilter::All.matches(state));
            assert_ne!(
                NotificationFilter::Read.matches(state),
                NotificationFilter::Unread.matches(state)
            );
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("root".parse::<UserRole>().is_err());
        assert!(Principal::new(1, UserRole::Admin).is_admin());
        assert!(!Principal::new(1, UserRole::User).is_admin());
    }
}
