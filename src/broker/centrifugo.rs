// ABOUTME: Centrifugo HTTP API client implementing the broker trait
// ABOUTME: Issues presence, publish, and broadcast calls authenticated with an API key
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Centrifugo server API client
//!
//! Each call is a `POST {base_url}/{method}` with a JSON body and an
//! `X-API-Key` header. Replies carry either `result` or `error`.
//!
//! # Example
//! ```rust,no_run
//! use herald_server::broker::{Broker, CentrifugoClient, CentrifugoConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CentrifugoClient::new(CentrifugoConfig {
//!     api_url: "http://localhost:8000/api".to_owned(),
//!     api_key: "secret".to_owned(),
//!     timeout_secs: 10,
//! })?;
//! let receipt = client
//!     .publish("notifications:user#1", &serde_json::json!({"title": "hi"}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use super::{Broker, BrokerError, PresenceClient, PublishReceipt};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Centrifugo client configuration
#[derive(Debug, Clone)]
pub struct CentrifugoConfig {
    /// Server API base URL, e.g. `http://localhost:8000/api`
    pub api_url: String,
    /// Server API key
    pub api_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Error object in a Centrifugo reply
#[derive(Debug, Deserialize)]
struct ApiError {
    code: u32,
    #[serde(default)]
    message: String,
}

/// Top-level Centrifugo reply
#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    result: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct PresenceResult {
    #[serde(default)]
    presence: HashMap<String, PresenceClient>,
}

#[derive(Debug, Deserialize)]
struct BroadcastResult {
    #[serde(default)]
    responses: Vec<ApiReply<Value>>,
}

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    channel: &'a str,
    data: &'a Value,
}

#[derive(Debug, Serialize)]
struct BroadcastRequest<'a> {
    channels: &'a [String],
    data: &'a Value,
}

/// Centrifugo HTTP API client
#[derive(Debug, Clone)]
pub struct CentrifugoClient {
    config: CentrifugoConfig,
    http_client: reqwest::Client,
}

impl CentrifugoClient {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Transport`] if the HTTP client cannot be built
    pub fn new(config: CentrifugoConfig) -> Result<Self, BrokerError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BrokerError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Call one API method and decode its `result`
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, BrokerError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{method}", self.config.api_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| BrokerError::Transport(format!("{method} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrokerError::Transport(format!(
                "{method} returned HTTP {status}"
            )));
        }

        let reply: ApiReply<T> = response
            .json()
            .await
            .map_err(|e| BrokerError::Decode(format!("{method}: {e}")))?;

        if let Some(error) = reply.error {
            return Err(BrokerError::Api {
                code: error.code,
                message: error.message,
            });
        }

        reply
            .result
            .ok_or_else(|| BrokerError::Decode(format!("{method}: reply has no result")))
    }
}

#[async_trait]
impl Broker for CentrifugoClient {
    #[tracing::instrument(skip(self), fields(clients = tracing::field::Empty))]
    async fn presence(&self, channel: &str) -> Result<Vec<PresenceClient>, BrokerError> {
        let result: PresenceResult = self.call("presence", &json!({ "channel": channel })).await?;

        let mut clients: Vec<PresenceClient> = result.presence.into_values().collect();
        clients.sort_by(|a, b| a.client.cmp(&b.client));
        tracing::Span::current().record("clients", clients.len());
        Ok(clients)
    }

    #[tracing::instrument(skip(self, data))]
    async fn publish(&self, channel: &str, data: &Value) -> Result<PublishReceipt, BrokerError> {
        self.call("publish", &PublishRequest { channel, data }).await
    }

    #[tracing::instrument(skip(self, data), fields(channels = channels.len()))]
    async fn broadcast(&self, channels: &[String], data: &Value) -> Result<(), BrokerError> {
        let result: BroadcastResult = self
            .call("broadcast", &BroadcastRequest { channels, data })
            .await?;

        match result.responses.into_iter().find_map(|reply| reply.error) {
            Some(error) => Err(BrokerError::Api {
                code: error.code,
                message: error.message,
            }),
            None => Ok(()),
        }
    }
}
