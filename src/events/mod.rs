//! Runtime events: types and broadcast bus.
//!
//! - [`EventKind`], [`Event`]: event classification and payload metadata
//! - [`EventBus`]: thin wrapper over `tokio::sync::broadcast`
//!
//! Publishers are the `Supervisor`, the `Producer` (pending overflow) and `SubscriberSet`
//! workers (panic/overflow). The supervisor's listener is the single consumer; it updates
//! the `AliveTracker` and fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::EventBus;
pub use event::{Event, EventKind};
