//! # Runtime events emitted by the supervisor, its workers and subscriber workers.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Worker lifecycle**: a worker starting, stopping cleanly, dying, being respawned
//! - **Shutdown**: request observed, drained within grace, grace exceeded
//! - **Diagnostics**: pending-buffer overflow, subscriber panic/overflow
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use stationhub::{Event, EventKind, Role};
//!
//! let ev = Event::new(EventKind::RespawnScheduled)
//!     .with_role(Role::Consumer)
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(2));
//!
//! assert_eq!(ev.role, Some(Role::Consumer));
//! assert_eq!(ev.delay_ms, Some(2000));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::Role;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// A worker instance was spawned.
    ///
    /// Sets `role` and `attempt` (1-based start count for that role).
    WorkerStarting,

    /// A worker returned `Ok(())`.
    ///
    /// Sets `role`, `attempt`.
    WorkerStopped,

    /// A worker returned an error or panicked.
    ///
    /// Sets `role`, `attempt`, `reason`.
    WorkerDied,

    /// A replacement instance is about to be spawned; the supervisor then cools down for
    /// `delay_ms` before handling the next exit.
    ///
    /// Sets `role`, `attempt` (the attempt that just ended), `delay_ms`.
    RespawnScheduled,

    // === Shutdown ===
    /// Shutdown requested (OS signal or [`SupervisorHandle::stop`](crate::SupervisorHandle::stop)).
    ShutdownRequested,

    /// All workers stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; `reason` lists the roles that were aborted.
    GraceExceeded,

    // === Diagnostics ===
    /// The Producer dropped its oldest pending message to stay within `max_pending`.
    ///
    /// Sets `role` and `reason`.
    PendingOverflow,

    /// A subscriber panicked during event processing.
    ///
    /// Sets `subscriber` and `reason` (panic info).
    SubscriberPanicked,

    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `subscriber` and `reason`.
    SubscriberOverflow,
}

impl EventKind {
    /// Stable snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::WorkerStarting => "worker_starting",
            EventKind::WorkerStopped => "worker_stopped",
            EventKind::WorkerDied => "worker_died",
            EventKind::RespawnScheduled => "respawn_scheduled",
            EventKind::ShutdownRequested => "shutdown_requested",
            EventKind::AllStoppedWithin => "all_stopped_within",
            EventKind::GraceExceeded => "grace_exceeded",
            EventKind::PendingOverflow => "pending_overflow",
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Worker the event is about, if any.
    pub role: Option<Role>,
    /// Start count of the worker (starting from 1).
    pub attempt: Option<u32>,
    /// Respawn delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Name of the subscriber, for subscriber diagnostics.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            role: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            subscriber: None,
        }
    }

    /// Attaches the worker role.
    #[inline]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a respawn delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
