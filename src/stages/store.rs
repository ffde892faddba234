//! Document persistence used by the built-in stages.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::StoreError;

/// Append-only document store addressed by collection name.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn save(&self, collection: &str, document: Value) -> Result<(), StoreError>;
}

pub type StoreRef = Arc<dyn Store>;

/// In-process store; documents are kept in insertion order per collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every document saved to `collection`.
    pub async fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        trace!(collection, "saving document");
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }
}
