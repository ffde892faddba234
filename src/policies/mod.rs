//! Respawn timing.
//!
//! - [`BackoffPolicy`]: how long to wait before replacing a dead worker
//! - [`JitterPolicy`]: randomization applied to that delay
//!
//! There is no restart policy: a worker that exits while the supervisor is running is
//! always replaced.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
