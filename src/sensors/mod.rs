//! Sensor simulator: readings published to the bus on the `sensors` topic.
//!
//! ```text
//! [Sensor…] ──read()──► SensorPublisher ──publish(JSON array)──► MessageBus "sensors"
//! ```
//!
//! Runs beside the supervisor, not under it.

mod publisher;
mod random;
mod sensor;

pub use publisher::SensorPublisher;
pub use random::RandomIntegerSensor;
pub use sensor::{Measurement, Sensor, now_timestamp};
