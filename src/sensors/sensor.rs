use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One reading produced by a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub sensor_id: String,
    pub name: String,
    pub description: String,
    pub value: Value,
    /// Unix time in seconds.
    pub timestamp: u64,
}

impl Measurement {
    pub fn new(
        sensor_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        value: impl Into<Value>,
        timestamp: u64,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            name: name.into(),
            description: description.into(),
            value: value.into(),
            timestamp,
        }
    }
}

/// Seconds since the unix epoch, `0` if the clock is before it.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A source of measurements.
///
/// Disabled sensors are skipped by the publisher; `read` on a disabled sensor returns nothing.
pub trait Sensor: Send + Sync + 'static {
    /// Stable identifier, copied into every measurement.
    fn id(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn enable(&self);

    fn disable(&self);

    /// Takes one reading.
    fn read(&self) -> Vec<Measurement>;
}
