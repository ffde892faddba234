//! # Event subscribers.
//!
//! ```text
//! Supervisor/Producer ── publish(Event) ──► EventBus ──► supervisor listener
//!                                                             │
//!                                                             ├──► AliveTracker::update()
//!                                                             └──► SubscriberSet::emit()
//!                                                                     ├──► LogWriter
//!                                                                     └──► custom ...
//! ```
//!
//! - [`Subscribe`]: trait for custom handlers.
//! - [`SubscriberSet`]: bounded per-subscriber queues with panic isolation.
//! - [`LogWriter`]: events as `tracing` records.
//! - [`AliveTracker`]: stateful liveness view, updated directly by the supervisor.

mod alive;
mod log;
mod set;
mod subscriber;

pub use alive::AliveTracker;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;

pub(crate) use set::panic_message;
