//! # In-process pub/sub broker.
//!
//! [`MemoryBus`] is the broker; [`MemoryClient`] is one connection to it with its own
//! subscription set and inbox, the way a pub/sub client connection behaves.
//!
//! ## Rules
//! - `publish` delivers to every connection subscribed to the topic at send time;
//!   messages published before a subscription are not replayed.
//! - Subscribing and unsubscribing enqueue an acknowledgement into the connection's
//!   own inbox; `get_message` consumes it and reports "no message".
//! - Inboxes are unbounded; a slow reader never blocks publishers.
//! - Connections whose client was dropped are pruned on the next publish.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time;
use tracing::{debug, trace};

use crate::bus::MessageBus;
use crate::error::BusError;
use crate::message::{Message, Payload};

/// Per-connection state held by the broker.
struct Connection {
    topics: Vec<String>,
    inbox: mpsc::UnboundedSender<Message>,
}

#[derive(Default)]
struct Broker {
    connections: RwLock<HashMap<u64, Connection>>,
    next_id: AtomicU64,
}

/// In-memory broker. Cheap to clone; clones share the same topics.
#[derive(Clone, Default)]
pub struct MemoryBus {
    broker: Arc<Broker>,
}

impl MemoryBus {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new connection with no subscriptions.
    pub async fn connect(&self) -> MemoryClient {
        let id = self.broker.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.broker.connections.write().await.insert(
            id,
            Connection {
                topics: Vec::new(),
                inbox: tx,
            },
        );
        MemoryClient {
            id,
            broker: Arc::clone(&self.broker),
            inbox: Mutex::new(rx),
        }
    }

    /// Publishes `payload` on `topic`; returns the number of receiving connections.
    pub async fn publish(&self, topic: &str, payload: impl Into<Payload>) -> usize {
        self.broker.publish(topic, payload.into()).await
    }

    /// Number of connections currently subscribed to `topic`.
    pub async fn subscribers(&self, topic: &str) -> usize {
        self.broker
            .connections
            .read()
            .await
            .values()
            .filter(|c| c.topics.iter().any(|t| t == topic))
            .count()
    }
}

impl Broker {
    async fn publish(&self, topic: &str, payload: Payload) -> usize {
        let mut conns = self.connections.write().await;
        let message = Message::data(topic, payload);
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (id, conn) in conns.iter() {
            if !conn.topics.iter().any(|t| t == topic) {
                continue;
            }
            if conn.inbox.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }
        for id in dead {
            conns.remove(&id);
        }
        trace!(topic, delivered, "published");
        delivered
    }
}

/// One connection to a [`MemoryBus`].
pub struct MemoryClient {
    id: u64,
    broker: Arc<Broker>,
    inbox: Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl MemoryClient {
    /// Returns the topics this connection is subscribed to, in subscription order.
    pub async fn topics(&self) -> Vec<String> {
        self.broker
            .connections
            .read()
            .await
            .get(&self.id)
            .map(|c| c.topics.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageBus for MemoryClient {
    async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        let mut conns = self.broker.connections.write().await;
        let conn = conns.get_mut(&self.id).ok_or(BusError::Closed)?;
        if !conn.topics.iter().any(|t| t == topic) {
            conn.topics.push(topic.to_string());
        }
        debug!(topic, "subscribed");
        conn.inbox
            .send(Message::subscribed(topic, conn.topics.len()))
            .map_err(|_| BusError::Closed)
    }

    async fn unsubscribe(&self, topic: Option<&str>) -> Result<(), BusError> {
        let mut conns = self.broker.connections.write().await;
        let conn = conns.get_mut(&self.id).ok_or(BusError::Closed)?;
        let removed: Vec<String> = match topic {
            Some(topic) => {
                let before = conn.topics.len();
                conn.topics.retain(|t| t != topic);
                if conn.topics.len() < before {
                    vec![topic.to_string()]
                } else {
                    Vec::new()
                }
            }
            None => std::mem::take(&mut conn.topics),
        };

        let mut remaining = conn.topics.len() + removed.len();
        for topic in removed {
            remaining -= 1;
            debug!(topic = %topic, "unsubscribed");
            conn.inbox
                .send(Message::unsubscribed(topic, remaining))
                .map_err(|_| BusError::Closed)?;
        }
        Ok(())
    }

    async fn get_message(&self, timeout: Duration) -> Result<Option<Message>, BusError> {
        let recv = async {
            let mut inbox = self.inbox.lock().await;
            inbox.recv().await
        };
        match time::timeout(timeout, recv).await {
            Ok(Some(message)) if message.kind.is_control() => {
                trace!(kind = message.kind.as_str(), topic = %message.topic, "ignored acknowledgement");
                Ok(None)
            }
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(BusError::Closed),
            Err(_elapsed) => Ok(None),
        }
    }

    async fn publish(&self, topic: &str, payload: Payload) -> Result<usize, BusError> {
        Ok(self.broker.publish(topic, payload).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SHORT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn acknowledgement_is_ignored_then_data_arrives() {
        let bus = MemoryBus::new();
        let client = bus.connect().await;
        client.subscribe("testing").await.unwrap();

        assert_eq!(client.get_message(SHORT).await.unwrap(), None);

        assert_eq!(bus.publish("testing", "test-data").await, 1);
        let message = client.get_message(SHORT).await.unwrap();
        assert_eq!(client.decode(message.as_ref()), Some(json!("test-data")));
    }

    #[tokio::test]
    async fn only_subscribed_topics_are_delivered() {
        let bus = MemoryBus::new();
        let client = bus.connect().await;
        client.subscribe("test_topic1").await.unwrap();
        client.subscribe("test_topic2").await.unwrap();
        assert_eq!(client.topics().await, vec!["test_topic1", "test_topic2"]);

        assert_eq!(bus.publish("other", "x").await, 0);
        assert_eq!(bus.publish("test_topic2", "y").await, 1);
        assert_eq!(bus.subscribers("test_topic1").await, 1);
    }

    #[tokio::test]
    async fn unsubscribe_all_stops_delivery() {
        let bus = MemoryBus::new();
        let client = bus.connect().await;
        client.subscribe("a").await.unwrap();
        client.subscribe("b").await.unwrap();
        client.unsubscribe(None).await.unwrap();

        assert!(client.topics().await.is_empty());
        assert_eq!(bus.publish("a", "lost").await, 0);
        // Only acknowledgements remain in the inbox.
        for _ in 0..4 {
            assert_eq!(client.get_message(SHORT).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn dropped_clients_are_pruned() {
        let bus = MemoryBus::new();
        let client = bus.connect().await;
        client.subscribe("sensors").await.unwrap();
        drop(client);

        assert_eq!(bus.publish("sensors", "x").await, 0);
        assert_eq!(bus.subscribers("sensors").await, 0);
    }
}
