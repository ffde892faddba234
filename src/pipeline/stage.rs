//! # Stages and the ordered chain they form.
//!
//! A [`Stage`] has a stable, unique [`name`](Stage::name) and an async
//! [`process`](Stage::process) that returns whether the next stage should run.
//! [`StageFn`] wraps a plain closure; [`StageChain`] holds the ordered, name-unique
//! list shared by the supervisor and every Consumer instance.
//!
//! ## Rules
//! - Stages run in registration order, one message at a time, from a single Consumer task.
//! - `Ok(false)` ends the chain for the current message.
//! - `Err(_)` aborts the current message and ends the Consumer run; stages own their
//!   recoverable failures.
//! - Stages must not block indefinitely.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{PipelineError, StageError};
use crate::message::Message;

/// Named unit of message processing.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use stationhub::{Message, Stage, StageError};
///
/// struct OnlySensors;
///
/// #[async_trait]
/// impl Stage for OnlySensors {
///     fn name(&self) -> &str { "only-sensors" }
///
///     async fn process(&self, message: &Message) -> Result<bool, StageError> {
///         Ok(&*message.topic == "sensors")
///     }
/// }
/// ```
#[async_trait]
pub trait Stage: Send + Sync + 'static {
    /// Stable, human-readable name, unique within one chain.
    fn name(&self) -> &str;

    /// Processes `message`; `Ok(true)` lets the next stage run.
    async fn process(&self, message: &Message) -> Result<bool, StageError>;
}

/// Shared handle to a stage.
pub type StageRef = Arc<dyn Stage>;

/// Closure-backed stage.
///
/// ```
/// use stationhub::{Message, Stage, StageFn, StageRef};
///
/// let keep_all: StageRef = StageFn::arc("keep-all", |_msg: &Message| Ok(true));
/// assert_eq!(keep_all.name(), "keep-all");
/// ```
pub struct StageFn<F> {
    name: String,
    f: F,
}

impl<F> StageFn<F>
where
    F: Fn(&Message) -> Result<bool, StageError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the stage and returns it as a [`StageRef`].
    pub fn arc(name: impl Into<String>, f: F) -> StageRef {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F> Stage for StageFn<F>
where
    F: Fn(&Message) -> Result<bool, StageError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, message: &Message) -> Result<bool, StageError> {
        (self.f)(message)
    }
}

/// Ordered list of uniquely named stages.
///
/// Readers take a snapshot per message, so stages may be added or removed at any time
/// without disturbing a message already in flight.
#[derive(Default)]
pub struct StageChain {
    stages: RwLock<Vec<StageRef>>,
}

impl StageChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a chain from `stages` in order; fails on the first repeated name.
    pub fn from_stages(stages: Vec<StageRef>) -> Result<Self, PipelineError> {
        let mut seen = Vec::with_capacity(stages.len());
        for stage in &stages {
            if seen.contains(&stage.name()) {
                return Err(PipelineError::DuplicateStage {
                    name: stage.name().to_string(),
                });
            }
            seen.push(stage.name());
        }
        Ok(Self {
            stages: RwLock::new(stages),
        })
    }

    /// Appends `stage`; fails if its name is already registered (the chain is left unchanged).
    pub async fn add(&self, stage: StageRef) -> Result<(), PipelineError> {
        let mut stages = self.stages.write().await;
        if stages.iter().any(|s| s.name() == stage.name()) {
            return Err(PipelineError::DuplicateStage {
                name: stage.name().to_string(),
            });
        }
        stages.push(stage);
        Ok(())
    }

    /// Removes the first stage named `name`; returns whether one was removed.
    pub async fn remove(&self, name: &str) -> bool {
        let mut stages = self.stages.write().await;
        match stages.iter().position(|s| s.name() == name) {
            Some(idx) => {
                stages.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Stage names in execution order.
    pub async fn names(&self) -> Vec<String> {
        self.stages
            .read()
            .await
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.stages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stages.read().await.is_empty()
    }

    /// Copy of the current stage list.
    pub(crate) async fn snapshot(&self) -> Vec<StageRef> {
        self.stages.read().await.clone()
    }
}
