// ABOUTME: In-memory broker recording publishes with scriptable presence and failures
// ABOUTME: Backs local runs without Centrifugo and drives delivery tests deterministically

use super::{Broker, BrokerError, PresenceClient, PublishReceipt};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// One recorded publish
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    /// Target channel
    pub channel: String,
    /// Message body
    pub data: Value,
}

#[derive(Debug, Default)]
struct BrokerState {
    presence: HashMap<String, Vec<PresenceClient>>,
    published: Vec<PublishedMessage>,
    failing_channels: HashSet<String>,
    presence_calls: usize,
    broadcast_calls: usize,
    next_offset: u64,
}

/// Broker that keeps everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryBroker {
    state: RwLock<BrokerState>,
}

impl InMemoryBroker {
    /// Create an empty broker with nobody present
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `user` as connected to `channel`
    pub async fn connect(&self, channel: &str, user: &str) {
        let mut state = self.state.write().await;
        let clients = state.presence.entry(channel.to_owned()).or_default();
        let client = format!("client-{}-{}", user, clients.len() + 1);
        clients.push(PresenceClient {
            client,
            user: user.to_owned(),
        });
    }

    /// Drop every connection on `channel`
    pub async fn disconnect_all(&self, channel: &str) {
        self.state.write().await.presence.remove(channel);
    }

    /// Make every publish to `channel` fail
    pub async fn fail_publish_to(&self, channel: &str) {
        self.state
            .write()
            .await
            .failing_channels
            .insert(channel.to_owned());
    }

    /// Messages published so far, in order
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.state.read().await.published.clone()
    }

    /// Number of presence queries served
    pub async fn presence_calls(&self) -> usize {
        self.state.read().await.presence_calls
    }

    /// Number of multi-channel broadcast calls served
    pub async fn broadcast_calls(&self) -> usize {
        self.state.read().await.broadcast_calls
    }

    fn publish_locked(
        state: &mut BrokerState,
        channel: &str,
        data: &Value,
    ) -> Result<PublishReceipt, BrokerError> {
        if state.failing_channels.contains(channel) {
            return Err(BrokerError::Api {
                code: 100,
                message: format!("publish to {channel} rejected"),
            });
        }
        state.next_offset += 1;
        state.published.push(PublishedMessage {
            channel: channel.to_owned(),
            data: data.clone(),
        });
        Ok(PublishReceipt {
            offset: state.next_offset,
            epoch: "memory".to_owned(),
        })
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn presence(&self, channel: &str) -> Result<Vec<PresenceClient>, BrokerError> {
        let mut state = self.state.write().await;
        state.presence_calls += 1;
        Ok(state.presence.get(channel).cloned().unwrap_or_default())
    }

    async fn publish(&self, channel: &str, data: &Value) -> Result<PublishReceipt, BrokerError> {
        let mut state = self.state.write().await;
        Self::publish_locked(&mut state, channel, data)
    }

    async fn broadcast(&self, channels: &[String], data: &Value) -> Result<(), BrokerError> {
        let mut state = self.state.write().await;
        state.broadcast_calls += 1;
        for channel in channels {
            Self::publish_locked(&mut state, channel, data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_presence_reflects_connections() {
        let broker = InMemoryBroker::new();
        assert!(broker.presence("ch").await.unwrap().is_empty());

        broker.connect("ch", "7").await;
        broker.connect("ch", "7").await;
        let clients = broker.presence("ch").await.unwrap();
        assert_eq!(clients.len(), 2);
        assert_ne!(clients[0].client, clients[1].client);
        assert_eq!(broker.presence_calls().await, 2);

        broker.disconnect_all("ch").await;
        assert!(broker.presence("ch").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_records_and_fails_on_demand() {
        let broker = InMemoryBroker::new();
        let first = broker.publish("a", &json!({"n": 1})).await.unwrap();
        let second = broker.publish("a", &json!({"n": 2})).await.unwrap();
        assert_eq!(first.offset + 1, second.offset);

        broker.fail_publish_to("b").await;
        assert!(broker.publish("b", &json!({})).await.is_err());
        assert!(broker
            .broadcast(&["a".to_owned(), "b".to_owned()], &json!({}))
            .await
            .is_err());
        assert_eq!(broker.published().await.len(), 3);
        assert_eq!(broker.broadcast_calls().await, 1);
    }
}
