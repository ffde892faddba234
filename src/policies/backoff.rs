//! # Respawn delay policy.
//!
//! [`BackoffPolicy`] decides how long the supervisor cools down after replacing a worker
//! that died. The delay for the `n`-th consecutive death of a role (0-based) is
//! `first × factor^n`, clamped to `max`, then jittered. A worker that stayed up for at
//! least `max` resets its role's count.
//!
//! The default is a flat 2 seconds: `first = max = 2s`, `factor = 1.0`, no jitter.
//!
//! ```rust
//! use std::time::Duration;
//! use stationhub::{BackoffPolicy, JitterPolicy};
//!
//! let respawn = BackoffPolicy {
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(8),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//! assert_eq!(respawn.next(0), Duration::from_millis(500));
//! assert_eq!(respawn.next(2), Duration::from_secs(2));
//! assert_eq!(respawn.next(10), Duration::from_secs(8));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Cooldown schedule after a worker is replaced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first death.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth per consecutive death (`1.0` = constant).
    pub factor: f64,
    /// Randomization applied after clamping.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::constant(Duration::from_secs(2))
    }
}

impl BackoffPolicy {
    /// Same delay every time, no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Delay before respawn number `attempt` (0-indexed).
    ///
    /// Each attempt derives its base independently, so jitter never feeds back.
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}
