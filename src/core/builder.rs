//! # Supervisor builder.
//!
//! Collects the topic list, stages and event subscribers, validates them, and produces an
//! `Arc<Supervisor>`.
//!
//! ```text
//! Supervisor::builder(cfg, bus)
//!     .topics(..)?        InvalidTopics
//!     .stage(..)?         DuplicateStage
//!     .subscriber(..)
//!     .build()?           InvalidTopics if no topics were given
//! ```

use std::sync::Arc;

use crate::bus::BusRef;
use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::{IntoTopics, StageChain, StageRef, Topics};
use crate::subscribers::Subscribe;

use super::supervisor::Supervisor;

/// Builder for a [`Supervisor`].
///
/// Registration errors surface here, synchronously, before anything runs.
///
/// ```rust
/// use std::sync::Arc;
/// use stationhub::{Config, LogWriter, MemoryBus, Message, StageFn, Supervisor};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let broker = MemoryBus::new();
/// let sup = Supervisor::builder(Config::default(), Arc::new(broker.connect().await))
///     .topics("sensors")?
///     .stage(StageFn::arc("noop", |_: &Message| Ok(true)))?
///     .subscriber(Arc::new(LogWriter))
///     .build()?;
/// assert_eq!(sup.topics().as_slice(), ["sensors"]);
/// # Ok(())
/// # }
/// ```
pub struct SupervisorBuilder {
    cfg: Config,
    bus: BusRef,
    topics: Option<Topics>,
    stages: Vec<StageRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    pub fn new(cfg: Config, bus: BusRef) -> Self {
        Self {
            cfg,
            bus,
            topics: None,
            stages: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Sets the topics every Producer instance subscribes to (replaces earlier calls).
    pub fn topics(mut self, topics: impl IntoTopics) -> Result<Self, PipelineError> {
        self.topics = Some(topics.into_topics()?);
        Ok(self)
    }

    /// Appends a stage to the chain.
    pub fn stage(mut self, stage: StageRef) -> Result<Self, PipelineError> {
        if self.stages.iter().any(|s| s.name() == stage.name()) {
            return Err(PipelineError::DuplicateStage {
                name: stage.name().to_string(),
            });
        }
        self.stages.push(stage);
        Ok(self)
    }

    /// Appends several stages in order.
    pub fn stages(self, stages: impl IntoIterator<Item = StageRef>) -> Result<Self, PipelineError> {
        stages.into_iter().try_fold(self, |b, s| b.stage(s))
    }

    pub fn subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers.extend(subscribers);
        self
    }

    /// Builds the supervisor; topics are required.
    pub fn build(self) -> Result<Arc<Supervisor>, PipelineError> {
        let topics = self.topics.ok_or_else(|| PipelineError::invalid_topics("topics can't be absent"))?;
        let stages = StageChain::from_stages(self.stages)?;
        Ok(Arc::new(Supervisor::new_internal(
            self.cfg,
            self.bus,
            topics,
            stages,
            self.subscribers,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::message::Message;
    use crate::pipeline::StageFn;

    async fn builder() -> SupervisorBuilder {
        let broker = MemoryBus::new();
        Supervisor::builder(Config::default(), Arc::new(broker.connect().await))
    }

    #[tokio::test]
    async fn topics_are_required() {
        let err = builder().await.build().err().unwrap();
        assert!(matches!(err, PipelineError::InvalidTopics { .. }));
    }

    #[tokio::test]
    async fn duplicate_stage_is_rejected_at_registration() {
        let noop = || StageFn::arc("noop", |_: &Message| Ok(true));
        let err = builder().await.stage(noop()).unwrap().stage(noop()).err().unwrap();
        assert_eq!(err, PipelineError::DuplicateStage { name: "noop".into() });
    }
}
