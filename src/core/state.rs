//! # Supervisor lifecycle state.
//!
//! ```text
//! running ──(stop)──► stopping ──(workers joined or aborted)──► stopped
//!    └──(worker death)──► running
//! ```
//!
//! Transitions only move forward; the cell is shared by the supervisor loop and every
//! [`SupervisorHandle`](crate::SupervisorHandle).

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Stopping,
    Stopped,
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Running => "running",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Stopped => "stopped",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => SupervisorState::Running,
            1 => SupervisorState::Stopping,
            _ => SupervisorState::Stopped,
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forward-only atomic state cell.
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn get(&self) -> SupervisorState {
        SupervisorState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `to` if the current state is `from`; returns whether it did.
    pub(crate) fn advance(&self, from: SupervisorState, to: SupervisorState) -> bool {
        (to as u8) > (from as u8)
            && self
                .0
                .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Moves to `Stopped` from any state.
    pub(crate) fn finish(&self) {
        self.0.store(SupervisorState::Stopped as u8, Ordering::Release);
    }
}
