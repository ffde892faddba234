//! Messages delivered by the bus and the helpers that decode their payloads.
//!
//! - [`Message`]: payload plus delivery metadata (topic, kind)
//! - [`Payload`]: raw payload as handed over by the transport
//! - [`decode_message`]: bytes → UTF-8 → JSON (falling back to text)

mod decode;
mod envelope;

pub use decode::decode_message;
pub use envelope::{Message, MessageKind, Payload};
