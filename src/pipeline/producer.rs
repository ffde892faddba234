//! # Producer: bus → channel.
//!
//! Subscribes to its [`Topics`] and forwards every received message into the
//! [`BoundedChannel`], never dropping a message it already pulled off the bus.
//!
//! ## One tick
//! ```text
//! tick()
//!   ├─► bus.get_message(poll_timeout)              (acknowledgements → None)
//!   ├─► pending non-empty? put(head, put_timeout)
//!   │       └─ Full → head goes back to the front
//!   └─► fetched message?
//!           ├─ pending non-empty → append to pending (keeps arrival order)
//!           └─ put(message, put_timeout)
//!                   └─ Full → append to pending
//! ```
//!
//! ## Rules
//! - Pending messages are always offered to the channel before newly fetched ones.
//! - At most one pending message is drained per tick.
//! - Subscribe/unsubscribe happen exactly once per [`Producer::run`], bracketing the loop.
//! - The pending buffer is unbounded unless [`ProducerConfig::max_pending`] is set,
//!   in which case the oldest pending message is dropped to make room.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::bus::BusRef;
use crate::channel::BoundedChannel;
use crate::core::{Role, Worker};
use crate::error::{BusError, PipelineError, TaskError};
use crate::events::{Event, EventBus, EventKind};
use crate::message::Message;
use crate::pipeline::{IntoTopics, Topics, pause};

/// Producer timing and buffering knobs.
///
/// ## Sentinel values
/// - `max_pending = 0` → unbounded pending buffer
#[derive(Clone, Copy, Debug)]
pub struct ProducerConfig {
    /// Longest wait for one bus message per tick.
    pub poll_timeout: Duration,
    /// Longest wait for channel space per enqueue attempt.
    pub put_timeout: Duration,
    /// Pause between ticks.
    pub tick: Duration,
    /// Pending buffer bound (`0` = unbounded).
    pub max_pending: usize,
}

impl ProducerConfig {
    /// Returns the pending buffer bound as an `Option` (`None` = unbounded).
    #[inline]
    pub fn pending_limit(&self) -> Option<usize> {
        match self.max_pending {
            0 => None,
            n => Some(n),
        }
    }
}

impl Default for ProducerConfig {
    /// One second for every wait, unbounded pending buffer.
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            put_timeout: Duration::from_secs(1),
            tick: Duration::from_secs(1),
            max_pending: 0,
        }
    }
}

/// Forwards messages from the bus into the channel.
pub struct Producer {
    bus: BusRef,
    channel: Arc<BoundedChannel<Message>>,
    topics: Topics,
    cfg: ProducerConfig,
    pending: Mutex<VecDeque<Message>>,
    token: CancellationToken,
    events: Option<EventBus>,
}

impl Producer {
    /// Creates a producer with its own run flag.
    pub fn new(
        bus: BusRef,
        channel: Arc<BoundedChannel<Message>>,
        topics: Topics,
        cfg: ProducerConfig,
    ) -> Self {
        Self {
            bus,
            channel,
            topics,
            cfg,
            pending: Mutex::new(VecDeque::new()),
            token: CancellationToken::new(),
            events: None,
        }
    }

    /// Replaces the run flag, e.g. with a child of the supervisor's token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Reports pending-buffer overflows on `events`.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Seeds the pending buffer, e.g. with messages a dead predecessor never delivered.
    pub fn with_pending(mut self, pending: VecDeque<Message>) -> Self {
        self.pending = Mutex::new(pending);
        self
    }

    /// Empties the pending buffer and returns its messages in order.
    pub async fn take_pending(&self) -> VecDeque<Message> {
        std::mem::take(&mut *self.pending.lock().await)
    }

    /// Replaces the topic set entirely (no merge).
    ///
    /// Takes effect on the next [`Producer::run`]. On error the previous topics are kept.
    pub fn set_topics(&mut self, topics: impl IntoTopics) -> Result<(), PipelineError> {
        self.topics = topics.into_topics()?;
        Ok(())
    }

    /// Configured topics, in order.
    pub fn topics(&self) -> &[String] {
        self.topics.as_slice()
    }

    /// Number of messages waiting for channel space.
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Subscribes the bus connection to every configured topic.
    pub async fn subscribe_all(&self) -> Result<(), BusError> {
        for topic in &self.topics {
            info!(topic = %topic, "subscribing");
            self.bus.subscribe(topic).await?;
        }
        Ok(())
    }

    /// Drops every subscription of the bus connection.
    pub async fn unsubscribe_all(&self) -> Result<(), BusError> {
        self.bus.unsubscribe(None).await
    }

    /// True until [`Producer::shutdown`] is called.
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Clears the run flag; the loop exits at its next check.
    pub fn shutdown(&self) {
        info!("shutting down producer");
        self.token.cancel();
    }

    /// Runs the producer loop until shutdown or the first bus failure.
    pub async fn run(&self) -> Result<(), TaskError> {
        info!(topics = ?self.topics.as_slice(), "producer looping");
        self.subscribe_all().await?;

        let res = self.work_loop().await;

        if let Err(e) = self.unsubscribe_all().await {
            warn!(error = %e, "unsubscribe failed");
        }
        let pending = self.pending_len().await;
        info!(pending, "producer stopped");
        res
    }

    async fn work_loop(&self) -> Result<(), TaskError> {
        while self.is_running() {
            self.tick().await?;
            if !pause(&self.token, self.cfg.tick).await {
                break;
            }
        }
        Ok(())
    }

    /// Performs one processing step: poll the bus once, then feed the channel.
    pub async fn tick(&self) -> Result<(), TaskError> {
        let fetched = self.bus.get_message(self.cfg.poll_timeout).await?;
        match &fetched {
            Some(message) => debug!(%message, "polled message"),
            None => trace!("polled nothing"),
        }

        let mut pending = self.pending.lock().await;

        if let Some(head) = pending.pop_front() {
            if let Err(err) = self.channel.put(head, self.cfg.put_timeout).await {
                debug!(pending = pending.len() + 1, "channel full; keeping pending head");
                if let Some(head) = err.into_inner() {
                    pending.push_front(head);
                }
            }
        }

        let Some(message) = fetched else {
            return Ok(());
        };
        if !pending.is_empty() {
            self.park(&mut pending, message);
            return Ok(());
        }
        if let Err(err) = self.channel.put(message, self.cfg.put_timeout).await {
            debug!("channel full; parking message");
            if let Some(message) = err.into_inner() {
                self.park(&mut pending, message);
            }
        }
        Ok(())
    }

    fn park(&self, pending: &mut VecDeque<Message>, message: Message) {
        if let Some(limit) = self.cfg.pending_limit() {
            while pending.len() >= limit {
                let Some(dropped) = pending.pop_front() else {
                    break;
                };
                warn!(limit, message = %dropped, "pending buffer full; dropped oldest message");
                if let Some(events) = &self.events {
                    events.publish(
                        Event::new(EventKind::PendingOverflow)
                            .with_role(Role::Producer)
                            .with_reason(format!("dropped {dropped}")),
                    );
                }
            }
        }
        pending.push_back(message);
    }
}

#[async_trait]
impl Worker for Producer {
    fn role(&self) -> Role {
        Role::Producer
    }

    async fn run(&self) -> Result<(), TaskError> {
        Producer::run(self).await
    }

    fn shutdown(&self) {
        Producer::shutdown(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MemoryBus, MessageBus};
    use serde_json::json;

    const SHORT: Duration = Duration::from_millis(20);

    fn fast() -> ProducerConfig {
        ProducerConfig {
            poll_timeout: SHORT,
            put_timeout: SHORT,
            tick: SHORT,
            max_pending: 0,
        }
    }

    async fn create_producer(
        bus: &MemoryBus,
        capacity: usize,
        cfg: ProducerConfig,
    ) -> (Arc<BoundedChannel<Message>>, Producer) {
        let channel = Arc::new(BoundedChannel::new(capacity));
        let client: BusRef = Arc::new(bus.connect().await);
        let producer = Producer::new(client, channel.clone(), Topics::parse("test_topic").unwrap(), cfg);
        (channel, producer)
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn run_can_be_spawned() {
        let bus = MemoryBus::new();
        let (_, producer) = create_producer(&bus, 1, fast()).await;
        let run = producer.run();
        assert_send(&run);
        producer.shutdown();
        run.await.unwrap();
    }

    async fn next_text(channel: &BoundedChannel<Message>) -> serde_json::Value {
        let message = channel.get(SHORT).await.expect("channel should hold a message");
        crate::message::decode_message(Some(&message)).unwrap()
    }

    #[tokio::test]
    async fn set_topics_replaces_and_validates() {
        let bus = MemoryBus::new();
        let (_, mut producer) = create_producer(&bus, 1, fast()).await;

        producer.set_topics(&json!(["1", 2])).unwrap();
        assert_eq!(producer.topics(), ["1"]);

        producer.set_topics(vec!["a", "b"]).unwrap();
        assert_eq!(producer.topics(), ["a", "b"]);

        assert!(producer.set_topics("").is_err());
        assert!(producer.set_topics(None::<&str>).is_err());
        assert_eq!(producer.topics(), ["a", "b"]);
    }

    #[tokio::test]
    async fn queues_simple_messages() {
        let bus = MemoryBus::new();
        let (channel, producer) = create_producer(&bus, 5, fast()).await;
        producer.subscribe_all().await.unwrap();

        bus.publish("test_topic", "tm1").await;
        bus.publish("test_topic", "tm2").await;
        producer.tick().await.unwrap(); // acknowledgement
        producer.tick().await.unwrap(); // tm1
        producer.tick().await.unwrap(); // tm2

        assert_eq!(next_text(&channel).await, json!("tm1"));
        assert_eq!(next_text(&channel).await, json!("tm2"));
    }

    #[tokio::test]
    async fn pending_buffer_preserves_order_under_backpressure() {
        let bus = MemoryBus::new();
        let (channel, producer) = create_producer(&bus, 1, fast()).await;
        producer.subscribe_all().await.unwrap();

        bus.publish("test_topic", "tm1").await;
        bus.publish("test_topic", "tm2").await;
        producer.tick().await.unwrap(); // acknowledgement
        producer.tick().await.unwrap(); // tm1
        producer.tick().await.unwrap(); // channel full, tm2 parked
        assert_eq!(producer.pending_len().await, 1);

        assert_eq!(next_text(&channel).await, json!("tm1"));
        producer.tick().await.unwrap(); // pending tm2 drained
        assert_eq!(next_text(&channel).await, json!("tm2"));
        assert_eq!(producer.pending_len().await, 0);
    }

    #[tokio::test]
    async fn new_messages_queue_behind_pending_ones() {
        let bus = MemoryBus::new();
        let (channel, producer) = create_producer(&bus, 1, fast()).await;
        producer.subscribe_all().await.unwrap();

        for text in ["m1", "m2", "m3"] {
            bus.publish("test_topic", text).await;
        }
        for _ in 0..4 {
            producer.tick().await.unwrap();
        }
        // m1 in channel, m2 and m3 pending in arrival order.
        assert_eq!(producer.pending_len().await, 2);

        for expected in ["m1", "m2", "m3"] {
            assert_eq!(next_text(&channel).await, json!(expected));
            producer.tick().await.unwrap();
        }
    }

    #[tokio::test]
    async fn bounded_pending_drops_oldest() {
        let bus = MemoryBus::new();
        let cfg = ProducerConfig {
            max_pending: 1,
            ..fast()
        };
        let (channel, producer) = create_producer(&bus, 1, cfg).await;
        producer.subscribe_all().await.unwrap();

        for text in ["a", "b", "c"] {
            bus.publish("test_topic", text).await;
        }
        for _ in 0..4 {
            producer.tick().await.unwrap();
        }
        assert_eq!(producer.pending_len().await, 1);

        assert_eq!(next_text(&channel).await, json!("a"));
        producer.tick().await.unwrap();
        assert_eq!(next_text(&channel).await, json!("c"));
    }

    #[tokio::test]
    async fn pending_can_be_handed_to_a_successor() {
        let bus = MemoryBus::new();
        let (channel, producer) = create_producer(&bus, 1, fast()).await;
        producer.subscribe_all().await.unwrap();

        for text in ["m1", "m2"] {
            bus.publish("test_topic", text).await;
        }
        for _ in 0..3 {
            producer.tick().await.unwrap();
        }
        let carried = producer.take_pending().await;
        assert_eq!(producer.pending_len().await, 0);

        let client: BusRef = Arc::new(bus.connect().await);
        let successor = Producer::new(client, channel.clone(), Topics::parse("test_topic").unwrap(), fast())
            .with_pending(carried);
        assert_eq!(next_text(&channel).await, json!("m1"));
        successor.tick().await.unwrap();
        assert_eq!(next_text(&channel).await, json!("m2"));
    }

    #[tokio::test]
    async fn run_brackets_loop_with_subscriptions() {
        let bus = MemoryBus::new();
        let (channel, producer) = create_producer(&bus, 5, fast()).await;
        let producer = Arc::new(producer);

        let join = {
            let producer = producer.clone();
            tokio::spawn(async move { producer.run().await })
        };

        while bus.subscribers("test_topic").await == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        bus.publish("test_topic", "live").await;
        assert_eq!(
            crate::message::decode_message(channel.get(Duration::from_secs(2)).await.ok().as_ref()),
            Some(json!("live"))
        );

        producer.shutdown();
        assert!(!producer.is_running());
        join.await.unwrap().unwrap();
        assert_eq!(bus.subscribers("test_topic").await, 0);
    }

    #[tokio::test]
    async fn bus_failure_ends_the_run() {
        struct Broken;

        #[async_trait]
        impl MessageBus for Broken {
            async fn subscribe(&self, _: &str) -> Result<(), BusError> {
                Ok(())
            }
            async fn unsubscribe(&self, _: Option<&str>) -> Result<(), BusError> {
                Ok(())
            }
            async fn get_message(&self, _: Duration) -> Result<Option<Message>, BusError> {
                Err(BusError::Closed)
            }
            async fn publish(&self, _: &str, _: crate::message::Payload) -> Result<usize, BusError> {
                Err(BusError::Closed)
            }
        }

        let channel = Arc::new(BoundedChannel::new(1));
        let producer = Producer::new(Arc::new(Broken), channel, Topics::parse("t").unwrap(), fast());
        let err = producer.run().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
