//! Message bus: the pub/sub capability the Producer reads from.
//!
//! The concrete transport is an external collaborator. This module defines the
//! [`MessageBus`] seam and ships [`MemoryBus`], an in-process broker used by the
//! binary and the tests.
//!
//! ## Architecture
//! ```text
//! publisher ── publish(topic, payload) ──► MemoryBus (broker)
//!                                             │ fan-out to every connection
//!                                             │ subscribed to `topic`
//!                                             ▼
//!                            MemoryClient (one per process, injected)
//!                                             │ get_message(timeout)
//!                                             ▼
//!                                          Producer
//! ```

mod memory;
mod message_bus;

pub use memory::{MemoryBus, MemoryClient};
pub use message_bus::{BusRef, MessageBus};
