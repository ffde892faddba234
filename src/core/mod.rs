//! Runtime core: the supervisor and the worker contract it enforces.
//!
//! - [`worker`]: [`Role`] and the [`Worker`] trait implemented by Producer and Consumer;
//! - [`state`]: the forward-only `running → stopping → stopped` cell;
//! - [`supervisor`]: spawns, watches and respawns the two workers, drives shutdown;
//! - [`builder`]: synchronous registration of topics, stages and subscribers;
//! - [`shutdown`]: OS signal handling.

mod builder;
mod shutdown;
mod state;
mod supervisor;
mod worker;

pub use builder::SupervisorBuilder;
pub use shutdown::wait_for_shutdown_signal;
pub use state::SupervisorState;
pub use supervisor::{Supervisor, SupervisorHandle};
pub use worker::{Role, Worker, WorkerRef};
