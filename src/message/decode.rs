//! # Payload decoding.
//!
//! ```text
//! None                      ─► None
//! Bytes ─► UTF-8 text ─► JSON parse ─┬─ Ok  ─► parsed value
//!                                    └─ Err ─► Value::String(text)
//! Int / Float               ─► JSON number, unchanged
//! ```

use serde_json::Value;

use super::envelope::{Message, Payload};

/// Decodes the payload of `message`.
///
/// Returns `None` for an absent message. Byte payloads are read as UTF-8 (invalid
/// sequences are replaced) and parsed as JSON, falling back to the raw text.
/// Numeric payloads pass through unchanged.
pub fn decode_message(message: Option<&Message>) -> Option<Value> {
    let message = message?;
    let value = match &message.payload {
        Payload::Bytes(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            serde_json::from_str::<Value>(&text).unwrap_or_else(|_| Value::String(text.into_owned()))
        }
        Payload::Int(n) => Value::from(*n),
        Payload::Float(n) => Value::from(*n),
    };
    Some(value)
}
