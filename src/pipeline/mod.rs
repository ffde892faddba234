//! The two ends of the pipeline and the stage contract between them.
//!
//! ```text
//! MessageBus ──► Producer ──► BoundedChannel ──► Consumer ──► Stage₁ ──► Stage₂ ──► …
//!                   │                                             │
//!             pending buffer                              returns false → chain ends
//! ```
//!
//! - [`Producer`]: subscribes to [`Topics`], forwards bus messages into the channel,
//!   parking them in a pending buffer while the channel is full.
//! - [`Consumer`]: pulls one message per tick and threads it through a [`StageChain`].
//! - [`Stage`]: a named unit of processing that decides whether the chain continues.
//!
//! Both workers loop cooperatively on a [`CancellationToken`]: `shutdown()` cancels it and
//! the loop exits at the top of its next iteration (or immediately if it is pausing).

mod consumer;
mod producer;
mod stage;
mod topics;

pub use consumer::{Consumer, ConsumerConfig};
pub use producer::{Producer, ProducerConfig};
pub use stage::{Stage, StageChain, StageFn, StageRef};
pub use topics::{IntoTopics, Topics};

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Sleeps for `interval` unless `token` is cancelled first.
///
/// Returns `false` when the pause was cut short by cancellation.
pub(crate) async fn pause(token: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => true,
        _ = token.cancelled() => false,
    }
}
