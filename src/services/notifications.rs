// ABOUTME: Notification delivery workflow: create, presence check, publish, mark sent, mark read
// ABOUTME: Also serves filtered listing, broadcast to every regular user, and presence diagnostics
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Delivery state machine
//!
//! Per `(notification, user)` the lifecycle is
//! `Created -> Published -> Sent (per viewer) -> Read`.
//!
//! The presence snapshot is taken before the publish, so a subscriber that
//! connects in between is not marked sent. Delivery confirmation is best-effort.
//! `Read` does not require `Sent`.

use crate::broker::{Broker, Channel, PresenceClient, PublishReceipt};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::middleware::admin_guard::require_admin;
use crate::models::{Notification, NotificationFilter, NotificationPayload, Principal, UserRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Publish request, `{channel, data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Target channel, `notifications:user#<id>`
    pub channel: String,
    /// Notification payload
    pub data: NotificationPayload,
}

/// Broadcast request, `{data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRequest {
    /// Notification payload
    pub data: NotificationPayload,
}

/// Read marking request, `{notification_id}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarkReadRequest {
    /// Notification to mark
    pub notification_id: i64,
}

/// Filtered listing request, `{filter}`; a missing filter means `all`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRequest {
    /// Filter name
    #[serde(default)]
    pub filter: Option<String>,
}

impl FilterRequest {
    /// Requested filter, `all` when absent
    #[must_use]
    pub fn filter_or_all(&self) -> &str {
        self.filter.as_deref().unwrap_or("all")
    }
}

/// Result of one publish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Stored notification as it was right after creation
    pub notification: Notification,
    /// Broker acknowledgement
    pub receipt: PublishReceipt,
    /// Number of present viewers marked as having received it
    pub viewers_marked: usize,
}

/// Result of a broadcast, one entry per regular user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BroadcastOutcome {
    /// Outcomes in user id order
    pub delivered: Vec<PublishOutcome>,
}

/// Users currently subscribed to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    /// Channel queried
    pub channel: String,
    /// Distinct numeric user ids, ascending
    pub user_ids: Vec<i64>,
}

/// Distinct numeric user ids of present clients
///
/// Anonymous or non-numeric user ids are skipped.
#[must_use]
pub fn viewer_ids(clients: &[PresenceClient]) -> Vec<i64> {
    let mut ids = BTreeSet::new();
    for client in clients {
        match client.user.parse::<i64>() {
            Ok(id) if id > 0 => {
                ids.insert(id);
            }
            _ => warn!(
                client = %client.client,
                user = %client.user,
                "Skipping presence entry without a numeric user id"
            ),
        }
    }
    ids.into_iter().collect()
}

/// Publish `payload` to the user owning `channel`
///
/// # Errors
///
/// Returns `PermissionDenied` for non-admin callers, `InvalidInput` for a bad
/// channel, `ResourceNotFound` for an unknown user, `ExternalServiceError` if the
/// broker fails, or a database error
#[tracing::instrument(skip(database, broker, payload), fields(admin_id = principal.id))]
pub async fn publish(
    database: &Database,
    broker: &dyn Broker,
    principal: &Principal,
    channel: &str,
    payload: NotificationPayload,
) -> AppResult<PublishOutcome> {
    require_admin(principal)?;
    let channel: Channel = channel.parse()?;

    database
        .get_user(channel.user_id())
        .await?
        .ok_or_else(|| AppError::not_found("user").with_resource_id(channel.as_str()))?;

    deliver(database, broker, &channel, payload).await
}

/// Publish `payload` to every user with the `user` role, in id order
///
/// The first failure aborts the remaining users and is returned; notifications
/// already delivered stay delivered.
///
/// # Errors
///
/// Returns `PermissionDenied` for non-admin callers, or the first delivery failure
#[tracing::instrument(skip(database, broker, payload), fields(admin_id = principal.id))]
pub async fn broadcast(
    database: &Database,
    broker: &dyn Broker,
    principal: &Principal,
    payload: NotificationPayload,
) -> AppResult<BroadcastOutcome> {
    require_admin(principal)?;

    let recipients = database.list_users_by_role(UserRole::User).await?;
    let mut outcome = BroadcastOutcome {
        delivered: Vec::with_capacity(recipients.len()),
    };

    for user in &recipients {
        let channel = Channel::for_user(user.id);
        let delivered = deliver(database, broker, &channel, payload.clone())
            .await
            .map_err(|e| {
                warn!(
                    user_id = user.id,
                    delivered = outcome.delivered.len(),
                    remaining = recipients.len() - outcome.delivered.len(),
                    "Broadcast aborted: {}",
                    e
                );
                e.with_user_id(user.id)
            })?;
        outcome.delivered.push(delivered);
    }

    info!(recipients = outcome.delivered.len(), "Broadcast complete");
    Ok(outcome)
}

/// Mark one of the caller's notifications read
///
/// Marking twice keeps the first `read_at`.
///
/// # Errors
///
/// Returns `ResourceNotFound` if the notification does not exist or belongs to
/// someone else
pub async fn mark_as_read(
    database: &Database,
    principal: &Principal,
    notification_id: i64,
) -> AppResult<()> {
    let owned = database
        .get_notification(notification_id)
        .await?
        .is_some_and(|n| n.user_id == principal.id);

    if !owned {
        return Err(AppError::not_found("notification")
            .with_user_id(principal.id)
            .with_resource_id(notification_id.to_string()));
    }

    if database.mark_read(notification_id, principal.id).await? {
        info!(user_id = principal.id, notification_id, "Notification read");
    }
    Ok(())
}

/// The caller's notifications matching `filter`, oldest first
///
/// # Errors
///
/// Returns `InvalidFilter` for a filter outside the vocabulary, before any query
pub async fn list_filtered(
    database: &Database,
    principal: &Principal,
    filter: &str,
) -> AppResult<Vec<Notification>> {
    let filter: NotificationFilter = filter.parse()?;
    database
        .get_notifications_filtered(principal.id, filter)
        .await
}

/// Users currently subscribed to `channel`, admin only
///
/// # Errors
///
/// Returns `PermissionDenied` for non-admin callers or `ExternalServiceError`
/// if the broker fails
pub async fn presence(
    broker: &dyn Broker,
    principal: &Principal,
    channel: &str,
) -> AppResult<PresenceSnapshot> {
    require_admin(principal)?;
    if channel.trim().is_empty() {
        return Err(AppError::invalid_input("channel is required"));
    }

    let clients = broker.presence(channel).await?;
    Ok(PresenceSnapshot {
        channel: channel.to_owned(),
        user_ids: viewer_ids(&clients),
    })
}

/// Create, snapshot presence, publish, then mark present viewers sent
async fn deliver(
    database: &Database,
    broker: &dyn Broker,
    channel: &Channel,
    payload: NotificationPayload,
) -> AppResult<PublishOutcome> {
    let notification = database
        .create_notification(channel.user_id(), &payload)
        .await?;

    let viewers = viewer_ids(&broker.presence(channel.as_str()).await?);
    if viewers.is_empty() {
        info!(
            channel = %channel,
            notification_id = notification.id,
            "No active subscribers, notification stays unsent"
        );
    }

    let data = serde_json::to_value(&notification)?;
    let receipt = broker
        .publish(channel.as_str(), &data)
        .await
        .map_err(|e| AppError::from(e).with_resource_id(channel.as_str()))?;

    let mut viewers_marked = 0;
    for viewer in viewers {
        if database.mark_sent(notification.id, viewer).await? {
            viewers_marked += 1;
        }
    }

    info!(
        channel = %channel,
        notification_id = notification.id,
        offset = receipt.offset,
        viewers_marked,
        "Notification published"
    );

    Ok(PublishOutcome {
        notification,
        receipt,
        viewers_marked,
    })
}
