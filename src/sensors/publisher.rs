use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::BusRef;
use crate::error::BusError;
use crate::message::Payload;
use crate::pipeline::pause;
use crate::sensors::{Measurement, Sensor};
use crate::stages::SENSORS_TOPIC;

/// Reads every enabled sensor each tick and publishes the readings as one JSON array.
pub struct SensorPublisher {
    bus: BusRef,
    sensors: Vec<Arc<dyn Sensor>>,
    topic: String,
    tick: Duration,
    token: CancellationToken,
}

impl SensorPublisher {
    pub fn new(bus: BusRef, sensors: Vec<Arc<dyn Sensor>>, tick: Duration) -> Self {
        Self {
            bus,
            sensors,
            topic: SENSORS_TOPIC.to_string(),
            tick,
            token: CancellationToken::new(),
        }
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Readings of all enabled sensors, in sensor order.
    pub fn collect(&self) -> Vec<Measurement> {
        self.sensors
            .iter()
            .filter(|s| s.is_enabled())
            .flat_map(|s| s.read())
            .collect()
    }

    /// Publishes one batch; returns how many connections received it.
    pub async fn publish_once(&self) -> Result<usize, BusError> {
        let batch = self.collect();
        let body = serde_json::to_vec(&batch).map_err(|e| BusError::Transport {
            error: e.to_string(),
        })?;
        let receivers = self.bus.publish(&self.topic, Payload::Bytes(body)).await?;
        debug!(readings = batch.len(), receivers, "published readings");
        Ok(receivers)
    }

    /// Publishes until shut down. Publish failures are logged and retried next tick.
    pub async fn run(&self) {
        info!(sensors = self.sensors.len(), topic = %self.topic, "sensor publisher looping");
        loop {
            if let Err(e) = self.publish_once().await {
                warn!(error = %e, "publishing readings failed");
            }
            if !pause(&self.token, self.tick).await {
                break;
            }
        }
        info!("sensor publisher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MemoryBus, MessageBus};
    use crate::message::decode_message;
    use crate::sensors::RandomIntegerSensor;

    #[tokio::test]
    async fn publishes_enabled_readings_as_one_array() {
        let broker = MemoryBus::new();
        let listener = broker.connect().await;
        listener.subscribe(SENSORS_TOPIC).await.unwrap();
        listener.get_message(Duration::from_millis(10)).await.unwrap(); // acknowledgement

        let sensors: Vec<Arc<dyn Sensor>> = vec![
            Arc::new(RandomIntegerSensor::new(true)),
            Arc::new(RandomIntegerSensor::new(false)),
        ];
        let publisher = SensorPublisher::new(Arc::new(broker.connect().await), sensors, Duration::from_millis(10));
        assert_eq!(publisher.publish_once().await.unwrap(), 1);

        let message = listener.get_message(Duration::from_millis(100)).await.unwrap();
        let batch = decode_message(message.as_ref()).unwrap();
        assert_eq!(batch.as_array().map(Vec::len), Some(2));
        assert_eq!(batch[0]["sensor_id"], "random_integer");
    }
}
