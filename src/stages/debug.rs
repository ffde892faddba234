//! Debug stage: logs each message and ends the chain.

use async_trait::async_trait;
use tracing::debug;

use crate::error::StageError;
use crate::message::Message;
use crate::pipeline::Stage;

/// Logs every message at debug level and ends the chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugStage;

impl DebugStage {
    pub const NAME: &'static str = "DebugWorkflow";
}

#[async_trait]
impl Stage for DebugStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(&self, message: &Message) -> Result<bool, StageError> {
        debug!(%message, "DebugWorkflow");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_ends_the_chain() {
        let verdict = DebugStage.process(&Message::data("sensors", "x")).await.unwrap();
        assert!(!verdict);
    }
}
