//! Error types used by the hub.
//!
//! - [`PipelineError`]: synchronous configuration errors (topics, stage registration).
//! - [`ChannelError`]: expected control-flow signals of the [`BoundedChannel`](crate::BoundedChannel).
//! - [`BusError`]: failures reported by a [`MessageBus`](crate::MessageBus) implementation.
//! - [`StageError`] / [`StoreError`]: failures raised while processing a message.
//! - [`TaskError`]: the outcome of one Producer or Consumer run.
//! - [`RuntimeError`]: failures of the supervisor itself.
//!
//! Every enum exposes `as_label()`, a stable snake_case label for logs.

use std::time::Duration;
use thiserror::Error;

/// # Errors raised by the pipeline registration API.
///
/// These surface synchronously to the caller and never affect a running supervisor.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The topic configuration is empty or contains no usable topic.
    #[error("invalid topics: {reason}")]
    InvalidTopics {
        /// What was wrong with the input.
        reason: String,
    },

    /// A stage with the same name is already registered.
    #[error("stage {name:?} is already present in the pipeline")]
    DuplicateStage {
        /// Name of the conflicting stage.
        name: String,
    },

    /// No stage is registered under this name.
    #[error("unknown stage {name:?}")]
    UnknownStage {
        /// The requested name.
        name: String,
    },
}

impl PipelineError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            PipelineError::InvalidTopics { .. } => "pipeline_invalid_topics",
            PipelineError::DuplicateStage { .. } => "pipeline_duplicate_stage",
            PipelineError::UnknownStage { .. } => "pipeline_unknown_stage",
        }
    }

    pub(crate) fn invalid_topics(reason: impl Into<String>) -> Self {
        PipelineError::InvalidTopics {
            reason: reason.into(),
        }
    }
}

/// # Signals produced by the bounded channel.
///
/// Neither variant is a failure: `Full` tells the writer to park the item,
/// `Empty` tells the reader there was nothing to do this tick.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChannelError<T> {
    /// The channel stayed at capacity for the whole timeout. Carries the rejected item back.
    #[error("channel full")]
    Full(T),

    /// No item arrived within the timeout.
    #[error("channel empty")]
    Empty,
}

impl<T> ChannelError<T> {
    /// Returns the item rejected by a `put`, if any.
    pub fn into_inner(self) -> Option<T> {
        match self {
            ChannelError::Full(item) => Some(item),
            ChannelError::Empty => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::Full(_) => "channel_full",
            ChannelError::Empty => "channel_empty",
        }
    }
}

/// # Errors produced by a message bus connection.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The connection (or the broker behind it) is gone.
    #[error("bus connection closed")]
    Closed,

    /// Transport-level failure reported by the implementation.
    #[error("bus transport error: {error}")]
    Transport {
        /// The underlying error message.
        error: String,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Closed => "bus_closed",
            BusError::Transport { .. } => "bus_transport",
        }
    }
}

/// # Errors produced by a persistence backend.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend refused or failed to write the document.
    #[error("store write to {collection:?} failed: {error}")]
    Write {
        /// Target collection.
        collection: String,
        /// The underlying error message.
        error: String,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Write { .. } => "store_write",
        }
    }
}

/// # Errors raised by a stage while processing one message.
///
/// A stage error aborts the current message and ends the Consumer run;
/// the supervisor then respawns the Consumer.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The stage could not process the message.
    #[error("stage {stage:?} failed: {error}")]
    Failed {
        /// Name of the failing stage.
        stage: String,
        /// The underlying error message.
        error: String,
    },
}

impl StageError {
    /// Convenience constructor.
    pub fn failed(stage: impl Into<String>, error: impl ToString) -> Self {
        StageError::Failed {
            stage: stage.into(),
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StageError::Failed { .. } => "stage_failed",
        }
    }
}

/// # Outcome of one Producer or Consumer run.
///
/// Any error returned from a worker is treated as an unexpected death by the supervisor.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The worker failed but a fresh instance may succeed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error (e.g. the worker panicked).
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The worker observed cancellation mid-operation.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether a fresh instance could reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. })
    }
}

impl From<BusError> for TaskError {
    fn from(err: BusError) -> Self {
        TaskError::Fail {
            error: err.to_string(),
        }
    }
}

impl From<StageError> for TaskError {
    fn from(err: StageError) -> Self {
        TaskError::Fail {
            error: err.to_string(),
        }
    }
}

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Workers did not exit within the grace period and were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Roles that did not shut down in time.
        stuck: Vec<String>,
    },

    /// `run` was called on a supervisor that already ran.
    #[error("supervisor already started; build a new one to run again")]
    AlreadyStarted,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::AlreadyStarted => "runtime_already_started",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_full_hands_item_back() {
        let err = ChannelError::Full("tm1");
        assert_eq!(err.as_label(), "channel_full");
        assert_eq!(err.into_inner(), Some("tm1"));
        assert_eq!(ChannelError::<&str>::Empty.into_inner(), None);
    }

    #[test]
    fn stage_error_becomes_retryable_task_error() {
        let err: TaskError = StageError::failed("save", "disk full").into();
        assert!(err.is_retryable());
        assert_eq!(err.as_label(), "task_failed");
        assert!(err.to_string().contains("disk full"));
    }
}
