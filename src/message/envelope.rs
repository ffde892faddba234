//! # Bus messages.
//!
//! A [`Message`] is opaque to the pipeline: it carries the topic it was delivered on,
//! a [`MessageKind`] telling control events apart from data, and the raw [`Payload`].
//! Messages have no identity and are never deduplicated.

use std::fmt;
use std::sync::Arc;

/// Discriminates bus control events from real data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Acknowledgement of a subscription.
    Subscribe,
    /// Acknowledgement of an unsubscription.
    Unsubscribe,
    /// Data published on a topic.
    Data,
}

impl MessageKind {
    /// True for subscription acknowledgements.
    #[inline]
    pub fn is_control(&self) -> bool {
        !matches!(self, MessageKind::Data)
    }

    /// Returns a short stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Subscribe => "subscribe",
            MessageKind::Unsubscribe => "unsubscribe",
            MessageKind::Data => "message",
        }
    }
}

/// Raw payload as produced by the transport.
///
/// Byte payloads are what a real pub/sub transport hands over; the scalar variants
/// cover payloads that arrive already decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Bytes(s.into_bytes())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(b)
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Payload::Bytes(b.to_vec())
    }
}

impl From<i64> for Payload {
    fn from(n: i64) -> Self {
        Payload::Int(n)
    }
}

impl From<f64> for Payload {
    fn from(n: f64) -> Self {
        Payload::Float(n)
    }
}

impl From<&serde_json::Value> for Payload {
    fn from(v: &serde_json::Value) -> Self {
        Payload::Bytes(v.to_string().into_bytes())
    }
}

/// A message delivered on a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Control event or data.
    pub kind: MessageKind,
    /// Topic the message was delivered on.
    pub topic: Arc<str>,
    /// Raw payload. For acknowledgements this is the connection's subscription count.
    pub payload: Payload,
}

impl Message {
    /// Creates a data message.
    pub fn data(topic: impl Into<Arc<str>>, payload: impl Into<Payload>) -> Self {
        Self {
            kind: MessageKind::Data,
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Creates a subscription acknowledgement.
    pub fn subscribed(topic: impl Into<Arc<str>>, count: usize) -> Self {
        Self::ack(MessageKind::Subscribe, topic, count)
    }

    /// Creates an unsubscription acknowledgement.
    pub fn unsubscribed(topic: impl Into<Arc<str>>, count: usize) -> Self {
        Self::ack(MessageKind::Unsubscribe, topic, count)
    }

    fn ack(kind: MessageKind, topic: impl Into<Arc<str>>, count: usize) -> Self {
        Self {
            kind,
            topic: topic.into(),
            payload: Payload::Int(i64::try_from(count).unwrap_or(i64::MAX)),
        }
    }

    /// True if this is real data (not a bus acknowledgement).
    #[inline]
    pub fn is_data(&self) -> bool {
        !self.kind.is_control()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Bytes(b) => write!(
                f,
                "[{}] {} {:?}",
                self.kind.as_str(),
                self.topic,
                String::from_utf8_lossy(b)
            ),
            Payload::Int(n) => write!(f, "[{}] {} {n}", self.kind.as_str(), self.topic),
            Payload::Float(n) => write!(f, "[{}] {} {n}", self.kind.as_str(), self.topic),
        }
    }
}
