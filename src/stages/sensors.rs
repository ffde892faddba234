//! # Sensor readings → store.
//!
//! Accepts data messages on [`SENSORS_TOPIC`]. The payload is decoded as JSON; an array is
//! saved entry by entry, anything else as a single document, all under the `sensors`
//! collection. Other topics and control messages end the chain.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::StageError;
use crate::message::{Message, decode_message};
use crate::pipeline::Stage;
use crate::stages::StoreRef;

/// Topic the sensor publisher writes to.
pub const SENSORS_TOPIC: &str = "sensors";

/// Persists sensor readings.
pub struct SensorsStage {
    store: StoreRef,
    collection: String,
}

impl SensorsStage {
    pub const NAME: &'static str = "SensorsWorkflow";

    pub fn new(store: StoreRef) -> Self {
        Self {
            store,
            collection: SENSORS_TOPIC.to_string(),
        }
    }

    /// Saves into `collection` instead of `sensors`.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

#[async_trait]
impl Stage for SensorsStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(&self, message: &Message) -> Result<bool, StageError> {
        if !message.is_data() || &*message.topic != SENSORS_TOPIC {
            return Ok(false);
        }
        let documents = match decode_message(Some(message)) {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => Vec::new(),
            Some(single) => vec![single],
        };
        debug!(count = documents.len(), collection = %self.collection, "saving readings");
        for doc in documents {
            self.store
                .save(&self.collection, doc)
                .await
                .map_err(|e| StageError::failed(Self::NAME, e))?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::stages::{MemoryStore, Store};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn saves_each_array_entry_and_continues() {
        let store = Arc::new(MemoryStore::new());
        let stage = SensorsStage::new(store.clone());
        let payload = json!([{"name": "random_int_1", "value": 3}, {"name": "random_int_2", "value": 150}]);

        let verdict = stage.process(&Message::data(SENSORS_TOPIC, &payload)).await.unwrap();
        assert!(verdict);
        assert_eq!(store.documents("sensors").await.len(), 2);
    }

    #[tokio::test]
    async fn single_object_is_one_document() {
        let store = Arc::new(MemoryStore::new());
        let stage = SensorsStage::new(store.clone()).with_collection("readings");

        stage
            .process(&Message::data(SENSORS_TOPIC, &json!({"value": 1})))
            .await
            .unwrap();
        assert_eq!(store.documents("readings").await, vec![json!({"value": 1})]);
    }

    #[tokio::test]
    async fn other_topics_and_acks_end_the_chain() {
        let store = Arc::new(MemoryStore::new());
        let stage = SensorsStage::new(store.clone());

        assert!(!stage.process(&Message::data("alerts", "x")).await.unwrap());
        assert!(!stage.process(&Message::subscribed(SENSORS_TOPIC, 1)).await.unwrap());
        assert!(store.documents("sensors").await.is_empty());
    }

    struct Failing;

    #[async_trait]
    impl Store for Failing {
        async fn save(&self, collection: &str, _: Value) -> Result<(), StoreError> {
            Err(StoreError::Write {
                collection: collection.to_string(),
                error: "offline".into(),
            })
        }
    }

    #[tokio::test]
    async fn store_failure_is_a_stage_error() {
        let stage = SensorsStage::new(Arc::new(Failing));
        let err = stage
            .process(&Message::data(SENSORS_TOPIC, &json!([1])))
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "stage_failed");
        assert!(err.to_string().contains("offline"));
    }
}
