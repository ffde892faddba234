//! # Consumer: channel → stage chain.
//!
//! Pulls at most one message per tick from the [`BoundedChannel`] and threads it through
//! the [`StageChain`] in registration order.
//!
//! ```text
//! tick()
//!   ├─► channel.get(get_timeout)
//!   │      └─ Empty → nothing to do (not an error)
//!   └─► for stage in chain:
//!          ├─ Ok(true)  → next stage
//!          ├─ Ok(false) → stop, message done
//!          └─ Err(e)    → message dropped, error returned to the caller
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::channel::BoundedChannel;
use crate::core::{Role, Worker};
use crate::error::{PipelineError, StageError, TaskError};
use crate::message::Message;
use crate::pipeline::{StageChain, StageRef, pause};

/// Consumer timing knobs.
#[derive(Clone, Copy, Debug)]
pub struct ConsumerConfig {
    /// Longest wait for one message per tick.
    pub get_timeout: Duration,
    /// Pause between ticks.
    pub tick: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            get_timeout: Duration::from_secs(1),
            tick: Duration::from_secs(1),
        }
    }
}

/// Runs channel messages through the stage chain.
pub struct Consumer {
    channel: Arc<BoundedChannel<Message>>,
    stages: Arc<StageChain>,
    cfg: ConsumerConfig,
    token: CancellationToken,
}

impl Consumer {
    /// Creates a consumer with an empty stage chain.
    pub fn new(channel: Arc<BoundedChannel<Message>>, cfg: ConsumerConfig) -> Self {
        Self::with_chain(channel, Arc::new(StageChain::new()), cfg)
    }

    /// Creates a consumer sharing an existing stage chain.
    pub fn with_chain(
        channel: Arc<BoundedChannel<Message>>,
        stages: Arc<StageChain>,
        cfg: ConsumerConfig,
    ) -> Self {
        Self {
            channel,
            stages,
            cfg,
            token: CancellationToken::new(),
        }
    }

    /// Replaces the run flag, e.g. with a child of the supervisor's token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Appends a stage; fails with `DuplicateStage` if the name is taken.
    pub async fn add_stage(&self, stage: StageRef) -> Result<(), PipelineError> {
        debug!(stage = stage.name(), "loading stage");
        self.stages.add(stage).await
    }

    /// Removes the first stage named `name`; returns whether one was removed.
    pub async fn remove_stage(&self, name: &str) -> bool {
        self.stages.remove(name).await
    }

    /// The chain this consumer runs.
    pub fn stages(&self) -> &Arc<StageChain> {
        &self.stages
    }

    /// True until [`Consumer::shutdown`] is called.
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Clears the run flag; the loop exits at its next check.
    pub fn shutdown(&self) {
        info!("shutting down consumer");
        self.token.cancel();
    }

    /// Runs the consumer loop until shutdown or the first stage error.
    pub async fn run(&self) -> Result<(), TaskError> {
        let stages = self.stages.names().await;
        info!(?stages, "consumer looping");
        while self.is_running() {
            self.tick().await?;
            if !pause(&self.token, self.cfg.tick).await {
                break;
            }
        }
        info!("consumer stopped");
        Ok(())
    }

    /// Performs one processing step: take at most one message and run the chain on it.
    pub async fn tick(&self) -> Result<(), TaskError> {
        match self.channel.get(self.cfg.get_timeout).await {
            Ok(message) => {
                debug!(%message, "consuming message");
                self.process(&message).await?;
            }
            Err(_) => trace!("channel empty"),
        }
        Ok(())
    }

    /// Threads `message` through the chain, stopping at the first stage that returns false.
    pub async fn process(&self, message: &Message) -> Result<(), StageError> {
        for stage in self.stages.snapshot().await {
            if !stage.process(message).await? {
                trace!(stage = stage.name(), "stage ended the chain");
                break;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Worker for Consumer {
    fn role(&self) -> Role {
        Role::Consumer
    }

    async fn run(&self) -> Result<(), TaskError> {
        Consumer::run(self).await
    }

    fn shutdown(&self) {
        Consumer::shutdown(self)
    }
}
