// ABOUTME: Presence-aware publisher abstraction over an external pub/sub broker
// ABOUTME: Defines the broker trait, publish receipts, presence entries, and broker errors
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Broker
//!
//! Live delivery is delegated to an external pub/sub broker. The gateway only
//! needs three calls from it:
//!
//! - `presence(channel)`: who is subscribed right now
//! - `publish(channel, data)`: push one message, returning a receipt
//! - `broadcast(channels, data)`: push one message to many channels
//!
//! [`CentrifugoClient`] talks to a Centrifugo HTTP API. [`InMemoryBroker`]
//! records calls in memory for tests and local runs.

pub mod centrifugo;
pub mod channel;
pub mod memory;

pub use centrifugo::{CentrifugoClient, CentrifugoConfig};
pub use channel::Channel;
pub use memory::InMemoryBroker;

use crate::constants::service_names;
use crate::errors::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Broker acknowledgement of a publish
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Position of the message in the channel history
    #[serde(default)]
    pub offset: u64,
    /// Epoch of the channel history
    #[serde(default)]
    pub epoch: String,
}

/// One connected subscriber reported by a presence query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceClient {
    /// Broker connection id
    pub client: String,
    /// User id the connection authenticated as, empty for anonymous connections
    #[serde(default)]
    pub user: String,
}

/// Failures talking to the broker
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// Connection, timeout, or non-success HTTP status
    #[error("broker transport failure: {0}")]
    Transport(String),
    /// Broker answered with an error object
    #[error("broker error {code}: {message}")]
    Api {
        /// Broker error code
        code: u32,
        /// Broker error message
        message: String,
    },
    /// Broker reply could not be decoded
    #[error("unexpected broker reply: {0}")]
    Decode(String),
}

impl From<BrokerError> for AppError {
    fn from(error: BrokerError) -> Self {
        Self::external_service(service_names::CENTRIFUGO, error.to_string()).with_source(error)
    }
}

/// Operations the gateway consumes from the pub/sub broker
#[async_trait]
pub trait Broker: Send + Sync {
    /// Subscribers currently connected to `channel`
    async fn presence(&self, channel: &str) -> Result<Vec<PresenceClient>, BrokerError>;

    /// Publish `data` to `channel`
    async fn publish(&self, channel: &str, data: &Value) -> Result<PublishReceipt, BrokerError>;

    /// Publish `data` to every channel in `channels`
    ///
    /// User broadcasts in the notification service call [`Broker::publish`] per channel
    /// instead, since each recipient's stored row tracks its own presence and `sent_at`.
    async fn broadcast(&self, channels: &[String], data: &Value) -> Result<(), BrokerError>;
}
