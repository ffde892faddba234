//! # Supervised worker contract.
//!
//! The supervisor runs exactly two long-lived workers, one per [`Role`]. Each implements
//! [`Worker`]: a cooperative `run` loop and a `shutdown` that asks it to leave that loop.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;

/// Which end of the pipeline a worker is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Bus → channel.
    Producer,
    /// Channel → stages.
    Consumer,
}

impl Role {
    /// Both roles, in spawn order.
    pub const ALL: [Role; 2] = [Role::Producer, Role::Consumer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A long-running loop the supervisor keeps alive.
///
/// ## Rules
/// - `run` returns `Ok(())` only after `shutdown` was observed; any other exit is a death.
/// - `shutdown` is idempotent and never blocks.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    fn role(&self) -> Role;

    async fn run(&self) -> Result<(), TaskError>;

    fn shutdown(&self);
}

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;
