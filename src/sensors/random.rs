use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

use crate::sensors::{Measurement, Sensor, now_timestamp};

/// Emits two random integers per reading; handy for exercising the pipeline without hardware.
///
/// - `random_int_1` in `[0, 15]`
/// - `random_int_2` in `[100, 200]`
#[derive(Debug)]
pub struct RandomIntegerSensor {
    enabled: AtomicBool,
}

impl RandomIntegerSensor {
    pub const ID: &'static str = "random_integer";

    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }
}

impl Default for RandomIntegerSensor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Sensor for RandomIntegerSensor {
    fn id(&self) -> &str {
        Self::ID
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    fn read(&self) -> Vec<Measurement> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let mut rng = rand::rng();
        let timestamp = now_timestamp();
        vec![
            Measurement::new(
                Self::ID,
                "random_int_1",
                "A random integer between 0 and 15.",
                rng.random_range(0..=15i64),
                timestamp,
            ),
            Measurement::new(
                Self::ID,
                "random_int_2",
                "A random integer between 100 and 200",
                rng.random_range(100..=200i64),
                timestamp,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_stay_in_range() {
        let sensor = RandomIntegerSensor::default();
        for _ in 0..50 {
            let reading = sensor.read();
            assert_eq!(reading.len(), 2);
            let a = reading[0].value.as_i64().unwrap();
            let b = reading[1].value.as_i64().unwrap();
            assert!((0..=15).contains(&a));
            assert!((100..=200).contains(&b));
            assert_eq!(reading[0].timestamp, reading[1].timestamp);
        }
    }

    #[test]
    fn disabled_sensor_reads_nothing() {
        let sensor = RandomIntegerSensor::new(false);
        assert!(sensor.read().is_empty());
        sensor.enable();
        assert!(sensor.is_enabled());
    }
}
