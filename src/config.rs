//! # Hub configuration.
//!
//! [`Config`] gathers every knob of the supervisor and its two workers. All fields are
//! public; helper accessors hide the sentinel checks.
//!
//! ## Sentinel values
//! - `channel_capacity = 0`, `bus_capacity = 0` → clamped to 1
//! - `producer.max_pending = 0` → unbounded pending buffer
//! - `grace = 0s` → abort workers immediately on stop

use std::time::Duration;

use crate::pipeline::{ConsumerConfig, ProducerConfig};
use crate::policies::BackoffPolicy;

/// Configuration for one supervisor instance.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the channel between Producer and Consumer.
    pub channel_capacity: usize,

    /// Capacity of the runtime event bus ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Producer timing and pending-buffer bound.
    pub producer: ProducerConfig,

    /// Consumer timing.
    pub consumer: ConsumerConfig,

    /// Cooldown after a dead worker is replaced.
    ///
    /// Restart is unconditional; this only spaces out the attempts.
    pub respawn: BackoffPolicy,

    /// How long `stop` waits for both workers before aborting them.
    pub grace: Duration,
}

impl Config {
    #[inline]
    pub fn channel_capacity_clamped(&self) -> usize {
        self.channel_capacity.max(1)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Sets both workers' tick and wait intervals to `interval`.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.producer.poll_timeout = interval;
        self.producer.put_timeout = interval;
        self.producer.tick = interval;
        self.consumer.get_timeout = interval;
        self.consumer.tick = interval;
        self
    }
}

impl Default for Config {
    /// - `channel_capacity = 100`
    /// - `bus_capacity = 1024`
    /// - one second for every worker wait and tick, unbounded pending buffer
    /// - `respawn` = constant 2s
    /// - `grace = 10s`
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            bus_capacity: 1024,
            producer: ProducerConfig::default(),
            consumer: ConsumerConfig::default(),
            respawn: BackoffPolicy::default(),
            grace: Duration::from_secs(10),
        }
    }
}
