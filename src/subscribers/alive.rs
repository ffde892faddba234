//! # Worker lifecycle tracker with sequence-based ordering.
//!
//! Maintains which worker roles are currently alive and how many times each was started,
//! using event sequence numbers to handle out-of-order delivery.
//!
//! ```text
//! Supervisor ──► EventBus ──► supervisor listener ──► AliveTracker::update()
//!                                                            │
//!                                                            ▼
//!                                               HashMap<Role, WorkerState>
//!                                             (role → {last_seq, alive, starts})
//! ```
//!
//! ## Rules
//! - `WorkerStarting` marks alive and bumps `starts`; `WorkerStopped` / `WorkerDied` mark dead.
//! - Other events with a role only advance `last_seq`.
//! - Events with `seq <= last_seq` are rejected (stale).
//! - Reads are eventually consistent with the bus.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::core::Role;
use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Copy, Default)]
struct WorkerState {
    last_seq: Option<u64>,
    alive: bool,
    starts: u32,
}

/// Thread-safe tracker of worker liveness.
#[derive(Debug, Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<Role, WorkerState>>,
}

impl AliveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its role.
    ///
    /// Returns true if the alive status changed.
    /// ```text
    /// update(WorkerDied,     seq=100) → alive=false, last_seq=100
    /// update(WorkerStarting, seq=99)  → rejected (stale)
    /// ```
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(role) = ev.role else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(role).or_default();
        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);

        match ev.kind {
            EventKind::WorkerStarting => {
                entry.starts += 1;
                entry.alive = true;
                true
            }
            EventKind::WorkerStopped | EventKind::WorkerDied => {
                entry.alive = false;
                true
            }
            _ => false,
        }
    }

    /// True if `role` has started and not yet stopped or died.
    pub async fn is_alive(&self, role: Role) -> bool {
        self.state
            .read()
            .await
            .get(&role)
            .is_some_and(|ws| ws.alive)
    }

    /// How many instances of `role` have been started so far.
    pub async fn starts(&self, role: Role) -> u32 {
        self.state
            .read()
            .await
            .get(&role)
            .map_or(0, |ws| ws.starts)
    }

    /// Sorted names of the roles currently alive.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, ws)| ws.alive)
            .map(|(role, _)| role.as_str().to_string())
            .collect();
        alive.sort_unstable();
        alive
    }
}
