//! # Message bus capability.
//!
//! Any pub/sub transport can back the pipeline as long as it implements [`MessageBus`].
//! One connection is created at process start and shared by reference ([`BusRef`]).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BusError;
use crate::message::{Message, Payload, decode_message};

/// Publish/subscribe connection.
///
/// ### Implementation requirements
/// - `get_message` must never return subscription acknowledgements; reading one
///   counts as "no message" and yields `Ok(None)`.
/// - Every wait is bounded by the given timeout.
/// - Methods take `&self`; implementations synchronize internally.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Adds `topic` to this connection's subscriptions.
    async fn subscribe(&self, topic: &str) -> Result<(), BusError>;

    /// Removes `topic`, or every subscription when `None`.
    async fn unsubscribe(&self, topic: Option<&str>) -> Result<(), BusError>;

    /// Waits up to `timeout` for one message on the subscribed topics.
    async fn get_message(&self, timeout: Duration) -> Result<Option<Message>, BusError>;

    /// Publishes `payload` on `topic`, returning how many connections received it.
    async fn publish(&self, topic: &str, payload: Payload) -> Result<usize, BusError>;

    /// Decodes a message payload. See [`decode_message`].
    fn decode(&self, message: Option<&Message>) -> Option<Value> {
        decode_message(message)
    }
}

/// Shared handle to a bus connection.
pub type BusRef = Arc<dyn MessageBus>;
