//! # Logging subscriber.
//!
//! [`LogWriter`] renders every runtime event as a structured `tracing` record under the
//! `stationhub::events` target, so `RUST_LOG=stationhub::events=debug` isolates them.
//!
//! | Kind                                  | Level |
//! |---------------------------------------|-------|
//! | `WorkerDied`, `GraceExceeded`, `SubscriberPanicked` | error |
//! | `RespawnScheduled`, `PendingOverflow`, `SubscriberOverflow` | warn |
//! | everything else                       | info  |

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "stationhub::events";

/// Writes runtime events to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let role = e.role.map(|r| r.as_str()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::WorkerDied => {
                error!(target: TARGET, seq = e.seq, role, attempt = ?e.attempt, reason, "worker died");
            }
            EventKind::GraceExceeded => {
                error!(target: TARGET, seq = e.seq, stuck = reason, "grace exceeded");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, seq = e.seq, subscriber = ?e.subscriber, reason, "subscriber panicked");
            }
            EventKind::RespawnScheduled => {
                warn!(target: TARGET, seq = e.seq, role, attempt = ?e.attempt, delay_ms = ?e.delay_ms, "respawn scheduled");
            }
            EventKind::PendingOverflow => {
                warn!(target: TARGET, seq = e.seq, role, reason, "pending overflow");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, seq = e.seq, subscriber = ?e.subscriber, reason, "subscriber overflow");
            }
            kind => {
                info!(target: TARGET, seq = e.seq, role, attempt = ?e.attempt, "{kind}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
