//! # Name → stage constructor table.
//!
//! Resolves the stage names given on the command line into a chain. Registration is
//! explicit; there is no discovery.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::pipeline::StageRef;
use crate::stages::{DebugStage, SensorsStage, StoreRef};

type Factory = Box<dyn Fn() -> StageRef + Send + Sync>;

/// Known stages, keyed by a short lowercase name.
#[derive(Default)]
pub struct StageRegistry {
    factories: BTreeMap<String, Factory>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `debug` and `sensors`, the latter writing to `store`.
    pub fn builtin(store: StoreRef) -> Self {
        let mut registry = Self::new();
        registry.register("debug", || Arc::new(DebugStage));
        registry.register("sensors", move || Arc::new(SensorsStage::new(Arc::clone(&store))));
        registry
    }

    /// Adds or replaces the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> StageRef + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Builds a fresh stage for `name`, if registered.
    pub fn create(&self, name: &str) -> Option<StageRef> {
        self.factories.get(name).map(|f| f())
    }

    /// Builds stages for `names` in order; an unknown name fails the whole call.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<StageRef>, PipelineError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.create(name).ok_or_else(|| PipelineError::UnknownStage {
                    name: name.to_string(),
                })
            })
            .collect()
    }
}
